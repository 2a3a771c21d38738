use thiserror::Error;
use unijar_types::{EntryName, TypeError};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid entry name at index {index} of {input}: {source}")]
    InvalidName {
        input: String,
        index: usize,
        #[source]
        source: TypeError,
    },

    #[error("entry index {index} out of range for {input} ({len} entries)")]
    EntryOutOfRange {
        input: String,
        index: usize,
        len: usize,
    },

    #[error("entry {0} was already written to the output archive")]
    DuplicateOutput(EntryName),

    #[error("payload of {name} is {size} bytes, exceeding the {limit} byte limit")]
    PayloadTooLarge { name: EntryName, size: u64, limit: u64 },

    #[error("output archive was already finalized")]
    Finalized,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
