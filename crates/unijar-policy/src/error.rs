use std::fmt;

/// Policy configuration errors.
///
/// Every variant is detected while building a [`PolicyRegistry`] and before
/// any input is opened.
///
/// [`PolicyRegistry`]: crate::PolicyRegistry
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The rule list is empty.
    #[error("configuration error: policy has no rules")]
    NoRules,

    /// No rule matches every entry name.
    #[error("configuration error: policy has no catch-all rule (add a rule matching \"*\")")]
    NoCatchAll,

    /// A matcher expression could not be parsed.
    #[error("configuration error: invalid matcher {expr:?}: {reason}")]
    InvalidMatcher { expr: String, reason: String },

    /// A rule carries options its strategy does not accept.
    #[error("configuration error: rule {rule} ({strategy}): {reason}")]
    InvalidOptions {
        rule: usize,
        strategy: String,
        reason: String,
    },
}

impl PolicyError {
    pub(crate) fn matcher(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMatcher {
            expr: expr.into(),
            reason: reason.into(),
        }
    }
}

impl PartialEq for PolicyError {
    fn eq(&self, other: &Self) -> bool {
        // Compare by display representation for test convenience.
        fmt::format(format_args!("{self}")) == fmt::format(format_args!("{other}"))
    }
}

impl Eq for PolicyError {}

pub type PolicyResult<T> = Result<T, PolicyError>;
