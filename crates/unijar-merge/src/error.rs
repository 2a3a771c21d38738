use std::fmt;

use unijar_archive::ArchiveError;
use unijar_policy::{PolicyError, StrategyKind};
use unijar_types::{EntryName, InputId};

/// Errors that abort a merge.
///
/// Every variant is fatal: nothing is retried and the output sink is never
/// closed once one of these is raised.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The policy failed validation.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The merge configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Two inputs were given the same position.
    #[error("configuration error: inputs {first} and {second} share a position")]
    DuplicateInput { first: InputId, second: InputId },

    /// A strict strategy saw a name more than once.
    #[error("duplicate entry {name} ({strategy}): first in {first}, again in {second}")]
    DuplicateEntry {
        name: EntryName,
        strategy: StrategyKind,
        first: InputId,
        second: InputId,
    },

    /// A content strategy could not parse an occurrence.
    #[error("malformed payload for {name} in {input} ({strategy}): {reason}")]
    MalformedPayload {
        name: EntryName,
        input: InputId,
        strategy: StrategyKind,
        reason: String,
    },

    /// A content strategy would have to hold more than the configured limit.
    #[error("payload of {name} in {input} is {size} bytes, over the {limit} byte limit")]
    PayloadTooLarge {
        name: EntryName,
        input: InputId,
        size: u64,
        limit: u64,
    },

    /// Reading an entry payload failed.
    #[error("failed to read {name} from {input}: {source}")]
    Io {
        name: EntryName,
        input: InputId,
        #[source]
        source: ArchiveError,
    },

    /// The input or output archive failed outside a payload read.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}

impl MergeError {
    /// The entry name this error concerns, if any.
    pub fn entry_name(&self) -> Option<&EntryName> {
        match self {
            Self::DuplicateEntry { name, .. }
            | Self::MalformedPayload { name, .. }
            | Self::PayloadTooLarge { name, .. }
            | Self::Io { name, .. } => Some(name),
            Self::Archive(ArchiveError::DuplicateOutput(name)) => Some(name),
            _ => None,
        }
    }

    /// Returns `true` if the error was raised before any input was read.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Policy(_) | Self::Config(_) | Self::DuplicateInput { .. }
        )
    }
}

impl PartialEq for MergeError {
    fn eq(&self, other: &Self) -> bool {
        // Compare by display representation for test convenience.
        fmt::format(format_args!("{self}")) == fmt::format(format_args!("{other}"))
    }
}

impl Eq for MergeError {}

pub type MergeResult<T> = Result<T, MergeError>;
