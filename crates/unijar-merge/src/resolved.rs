use unijar_types::{Compression, EntryName, EntryRecord};

/// Where the bytes of a resolved entry come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Stream the occurrence from its input at write time.
    Source(EntryRecord),
    /// Bytes built by a strategy.
    Bytes(Vec<u8>),
}

/// The single output representation of one entry name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub name: EntryName,
    pub payload: Payload,
    pub compression: Compression,
}

impl ResolvedEntry {
    /// Carry an input occurrence through unchanged.
    pub fn copy(record: EntryRecord) -> Self {
        Self {
            name: record.name.clone(),
            compression: record.compression,
            payload: Payload::Source(record),
        }
    }

    /// A strategy-built entry.
    pub fn synthetic(name: EntryName, data: Vec<u8>) -> Self {
        Self {
            name,
            payload: Payload::Bytes(data),
            compression: Compression::Deflated,
        }
    }

    /// Uncompressed payload length.
    pub fn size(&self) -> u64 {
        match &self.payload {
            Payload::Source(record) => record.size,
            Payload::Bytes(data) => data.len() as u64,
        }
    }
}
