use std::fmt;

use serde::{Deserialize, Serialize};

use crate::input::InputId;
use crate::name::EntryName;

/// Compression applied to an entry's payload inside the archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    /// Payload stored verbatim.
    Stored,
    /// Payload deflate-compressed.
    #[default]
    Deflated,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => f.write_str("stored"),
            Self::Deflated => f.write_str("deflated"),
        }
    }
}

/// One occurrence of an entry name inside one input archive.
///
/// A record describes the payload but does not hold it. The payload is
/// read through the owning source using `index`, at most once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Name of the entry.
    pub name: EntryName,
    /// Input archive the occurrence belongs to.
    pub input: InputId,
    /// Index of the entry within its input, in native order.
    pub index: usize,
    /// Uncompressed payload length in bytes.
    pub size: u64,
    /// CRC-32 of the uncompressed payload.
    pub crc32: u32,
    /// How the payload is compressed in the input.
    pub compression: Compression,
}

impl EntryRecord {
    /// Returns `true` if both records describe the same bytes (by size and CRC).
    pub fn same_content(&self, other: &EntryRecord) -> bool {
        self.size == other.size && self.crc32 == other.crc32
    }
}
