use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};
use crate::matcher::Matcher;

// ---------------------------------------------------------------------------
// StrategyKind
// ---------------------------------------------------------------------------

/// Identifies how all occurrences of one entry name are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Keep the first occurrence, ignore the rest.
    CopyFirst,
    /// Keep the first occurrence; any second occurrence is an error.
    CopyFirstUnique,
    /// Join the bytes of every occurrence in input order.
    Concatenate,
    /// Union the non-comment lines of every occurrence.
    MergeLines,
    /// Drop the name from the output.
    Skip,
}

impl StrategyKind {
    pub const ALL: [Self; 5] = [
        Self::CopyFirst,
        Self::CopyFirstUnique,
        Self::Concatenate,
        Self::MergeLines,
        Self::Skip,
    ];

    /// Configuration identifier, e.g. `"copy-first"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CopyFirst => "copy-first",
            Self::CopyFirstUnique => "copy-first-unique",
            Self::Concatenate => "concatenate",
            Self::MergeLines => "merge-lines",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown strategy: {s}"))
    }
}

// ---------------------------------------------------------------------------
// PolicyRule
// ---------------------------------------------------------------------------

/// A `(matcher, strategy, options)` triple.
///
/// Serialized flat, so a TOML `[[rule]]` table reads:
///
/// ```toml
/// [[rule]]
/// match = "META-INF/services/**"
/// strategy = "merge-lines"
/// sorted = true
/// ```
///
/// Each option applies to exactly one strategy; `validate` rejects the rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRule {
    #[serde(rename = "match")]
    pub matcher: Matcher,
    pub strategy: StrategyKind,
    /// `concatenate`: appended after each non-empty occurrence that does not
    /// already end with it, so the last occurrence is terminated too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminator: Option<String>,
    /// `copy-first`: warn when a later occurrence differs from the one kept.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub warn_duplicates: bool,
    /// `merge-lines`: emit lines sorted instead of in first-seen order.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sorted: bool,
}

impl PolicyRule {
    /// A rule with no options.
    pub fn new(matcher: Matcher, strategy: StrategyKind) -> Self {
        Self {
            matcher,
            strategy,
            terminator: None,
            warn_duplicates: false,
            sorted: false,
        }
    }

    /// Parse `expr` and build a rule with no options.
    pub fn parse(expr: &str, strategy: StrategyKind) -> PolicyResult<Self> {
        Ok(Self::new(Matcher::parse(expr)?, strategy))
    }

    pub fn with_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.terminator = Some(terminator.into());
        self
    }

    pub fn warn_duplicates(mut self) -> Self {
        self.warn_duplicates = true;
        self
    }

    pub fn sorted(mut self) -> Self {
        self.sorted = true;
        self
    }

    /// Validate the strategy/options combination. `index` is used in errors.
    pub(crate) fn validate(&self, index: usize) -> PolicyResult<()> {
        self.check_options().map_err(|reason| PolicyError::InvalidOptions {
            rule: index,
            strategy: self.strategy.to_string(),
            reason: reason.to_string(),
        })
    }

    fn check_options(&self) -> Result<(), &'static str> {
        if let Some(terminator) = &self.terminator {
            if self.strategy != StrategyKind::Concatenate {
                return Err("`terminator` only applies to `concatenate`");
            }
            if terminator.is_empty() {
                return Err("`terminator` must not be empty; omit it instead");
            }
        }
        if self.warn_duplicates && self.strategy != StrategyKind::CopyFirst {
            return Err("`warn_duplicates` only applies to `copy-first`");
        }
        if self.sorted && self.strategy != StrategyKind::MergeLines {
            return Err("`sorted` only applies to `merge-lines`");
        }
        Ok(())
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.matcher, self.strategy)?;
        if let Some(terminator) = &self.terminator {
            write!(f, " (terminator {terminator:?})")?;
        }
        if self.warn_duplicates {
            f.write_str(" (warn on duplicates)")?;
        }
        if self.sorted {
            f.write_str(" (sorted)")?;
        }
        Ok(())
    }
}
