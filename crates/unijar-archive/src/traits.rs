use std::io::Read;

use unijar_types::{Compression, EntryName, EntryRecord, InputId};

use crate::error::{ArchiveError, ArchiveResult};

/// One input archive, read entry by entry in its native order.
///
/// All implementations must satisfy these invariants:
/// - `record(i)` is stable: the same index always describes the same entry.
/// - `record` reads metadata only; payload bytes are produced by `open`.
/// - Callers open each payload at most once. Sources are not required to
///   support re-reading.
pub trait EntrySource {
    /// Identifier of this input.
    fn input(&self) -> &InputId;

    /// Number of entries in the input.
    fn len(&self) -> usize;

    /// Returns `true` if the input has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata for the entry at `index`.
    fn record(&mut self, index: usize) -> ArchiveResult<EntryRecord>;

    /// Open the uncompressed payload of the entry at `index`.
    fn open(&mut self, index: usize) -> ArchiveResult<Box<dyn Read + '_>>;
}

impl<T: EntrySource + ?Sized> EntrySource for Box<T> {
    fn input(&self) -> &InputId {
        (**self).input()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn record(&mut self, index: usize) -> ArchiveResult<EntryRecord> {
        (**self).record(index)
    }

    fn open(&mut self, index: usize) -> ArchiveResult<Box<dyn Read + '_>> {
        (**self).open(index)
    }
}

/// What the output sink needs to know about an entry before its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    pub name: EntryName,
    /// Compression hint carried over from the input or chosen by a strategy.
    pub compression: Compression,
    /// Uncompressed payload length, used to enable large-file records.
    pub size: u64,
}

/// Destination archive, written strictly in call order.
///
/// `close` consumes the sink, so it runs at most once. A sink that is
/// dropped without `close` must not leave a finalized archive behind.
pub trait EntrySink {
    /// Value handed back once the archive is finalized.
    type Output;

    /// Append one entry. Writing the same name twice is an error.
    fn write(&mut self, header: &EntryHeader, payload: &mut dyn Read) -> ArchiveResult<()>;

    /// Write the archive index/footer and release the destination.
    fn close(self) -> ArchiveResult<Self::Output>;
}

/// Largest buffer reserved up front from a declared entry size.
const PREALLOCATE_LIMIT: u64 = 64 * 1024;

/// Read the full payload of `record` into memory, refusing anything larger
/// than `limit` bytes.
pub fn read_payload<S: EntrySource + ?Sized>(
    source: &mut S,
    record: &EntryRecord,
    limit: u64,
) -> ArchiveResult<Vec<u8>> {
    if record.size > limit {
        return Err(ArchiveError::PayloadTooLarge {
            name: record.name.clone(),
            size: record.size,
            limit,
        });
    }
    let reader = source.open(record.index)?;
    // The declared size can lie; bound the preallocation and cap the read
    // one byte past the limit.
    let mut data = Vec::with_capacity(record.size.min(PREALLOCATE_LIMIT) as usize);
    reader.take(limit.saturating_add(1)).read_to_end(&mut data)?;
    if data.len() as u64 > limit {
        return Err(ArchiveError::PayloadTooLarge {
            name: record.name.clone(),
            size: data.len() as u64,
            limit,
        });
    }
    Ok(data)
}
