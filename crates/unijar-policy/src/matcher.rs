use std::fmt;
use std::str::FromStr;

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use unijar_types::EntryName;

use crate::error::{PolicyError, PolicyResult};

/// Glob semantics for entry names: case-sensitive, and `*` / `?` never
/// match `/`. Use `**` to cross directory boundaries.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Predicate over entry names.
///
/// Written in configuration as a string expression:
///
/// | Expression      | Matcher            |
/// |-----------------|--------------------|
/// | `*`, `**`, `any`| [`Matcher::Any`]   |
/// | `exact:X`       | [`Matcher::Exact`] |
/// | `prefix:X`      | [`Matcher::Prefix`]|
/// | `suffix:X`      | [`Matcher::Suffix`]|
/// | `glob:X` or `X` | [`Matcher::Glob`]  |
///
/// An explicit `glob:` prefix always yields a real glob, so `glob:*` only
/// matches names without a `/` and is never a catch-all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Matcher {
    /// Matches every name. The only catch-all.
    Any,
    /// Matches one name exactly.
    Exact(String),
    /// Matches names starting with the prefix.
    Prefix(String),
    /// Matches names ending with the suffix.
    Suffix(String),
    /// Matches names against a glob pattern.
    Glob(Pattern),
}

impl Matcher {
    /// Parse a matcher expression.
    pub fn parse(expr: &str) -> PolicyResult<Self> {
        if matches!(expr, "*" | "**" | "any") {
            return Ok(Self::Any);
        }

        let non_empty = |text: &str, kind: &str| -> PolicyResult<String> {
            if text.is_empty() {
                Err(PolicyError::matcher(expr, format!("{kind} text must not be empty")))
            } else {
                Ok(text.to_string())
            }
        };

        if let Some(text) = expr.strip_prefix("exact:") {
            return Ok(Self::Exact(non_empty(text, "exact")?));
        }
        if let Some(text) = expr.strip_prefix("prefix:") {
            return Ok(Self::Prefix(non_empty(text, "prefix")?));
        }
        if let Some(text) = expr.strip_prefix("suffix:") {
            return Ok(Self::Suffix(non_empty(text, "suffix")?));
        }

        let pattern = non_empty(expr.strip_prefix("glob:").unwrap_or(expr), "glob")?;
        Pattern::new(&pattern)
            .map(Self::Glob)
            .map_err(|e| PolicyError::matcher(expr, e.msg))
    }

    /// Returns `true` if this matcher accepts `name`.
    pub fn matches(&self, name: &EntryName) -> bool {
        let name = name.as_str();
        match self {
            Self::Any => true,
            Self::Exact(text) => name == text,
            Self::Prefix(text) => name.starts_with(text.as_str()),
            Self::Suffix(text) => name.ends_with(text.as_str()),
            Self::Glob(pattern) => pattern.matches_with(name, GLOB_OPTIONS),
        }
    }

    /// Returns `true` if this matcher accepts every possible name.
    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(text) => write!(f, "exact:{text}"),
            Self::Prefix(text) => write!(f, "prefix:{text}"),
            Self::Suffix(text) => write!(f, "suffix:{text}"),
            Self::Glob(pattern) => write!(f, "glob:{}", pattern.as_str()),
        }
    }
}

impl FromStr for Matcher {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Matcher {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Matcher> for String {
    fn from(matcher: Matcher) -> Self {
        matcher.to_string()
    }
}
