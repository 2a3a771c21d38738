use std::collections::HashSet;
use std::io::{self, Read};

use unijar_types::{Compression, EntryName, EntryRecord, InputId, TypeError};

use crate::error::{ArchiveError, ArchiveResult};
use crate::traits::{EntryHeader, EntrySink, EntrySource};

/// A single entry held by a [`MemorySource`].
#[derive(Clone, Debug)]
pub struct MemoryEntry {
    pub name: EntryName,
    pub data: Vec<u8>,
    pub compression: Compression,
}

/// In-memory input archive for tests and embedding.
///
/// Counts metadata and payload reads so callers can assert how the merge
/// engine touched the input.
#[derive(Clone, Debug)]
pub struct MemorySource {
    input: InputId,
    entries: Vec<MemoryEntry>,
    records_read: usize,
    payloads_opened: Vec<usize>,
    failing_open: Option<usize>,
}

impl MemorySource {
    pub fn new(input: InputId) -> Self {
        Self {
            input,
            entries: Vec::new(),
            records_read: 0,
            payloads_opened: Vec::new(),
            failing_open: None,
        }
    }

    /// Build a source from `(name, bytes)` pairs, all deflated.
    pub fn from_entries(
        position: usize,
        label: &str,
        entries: &[(&str, &[u8])],
    ) -> Result<Self, TypeError> {
        let mut source = Self::new(InputId::new(position, label));
        for (name, data) in entries {
            source.push(EntryName::new(*name)?, data.to_vec(), Compression::Deflated);
        }
        Ok(source)
    }

    /// Append an entry.
    pub fn push(&mut self, name: EntryName, data: Vec<u8>, compression: Compression) {
        self.entries.push(MemoryEntry {
            name,
            data,
            compression,
        });
    }

    /// Make `open` fail for the entry at `index`, as a truncated or
    /// unreadable archive member would.
    pub fn fail_open_at(&mut self, index: usize) {
        self.failing_open = Some(index);
    }

    /// Number of `record` calls served.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Indices of every payload opened, in order.
    pub fn payloads_opened(&self) -> &[usize] {
        &self.payloads_opened
    }

    fn entry(&self, index: usize) -> ArchiveResult<&MemoryEntry> {
        self.entries
            .get(index)
            .ok_or_else(|| ArchiveError::EntryOutOfRange {
                input: self.input.to_string(),
                index,
                len: self.entries.len(),
            })
    }
}

impl EntrySource for MemorySource {
    fn input(&self) -> &InputId {
        &self.input
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn record(&mut self, index: usize) -> ArchiveResult<EntryRecord> {
        let entry = self.entry(index)?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&entry.data);
        let record = EntryRecord {
            name: entry.name.clone(),
            input: self.input.clone(),
            index,
            size: entry.data.len() as u64,
            crc32: hasher.finalize(),
            compression: entry.compression,
        };
        self.records_read += 1;
        Ok(record)
    }

    fn open(&mut self, index: usize) -> ArchiveResult<Box<dyn Read + '_>> {
        self.entry(index)?;
        self.payloads_opened.push(index);
        if self.failing_open == Some(index) {
            return Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry {index} of {} is unreadable", self.input),
            )));
        }
        Ok(Box::new(self.entries[index].data.as_slice()))
    }
}

/// One observed call on a [`RecordingSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Write {
        name: EntryName,
        compression: Compression,
        data: Vec<u8>,
    },
    Close,
}

impl SinkEvent {
    /// Short tag for the call, `"write"` or `"close"`.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::Close => "close",
        }
    }
}

/// Sink that records every call into a log owned by the caller.
///
/// The log outlives the sink, so a failed merge that drops the sink can
/// still be inspected to confirm `close` never happened.
pub struct RecordingSink<'a> {
    events: &'a mut Vec<SinkEvent>,
    written: HashSet<EntryName>,
}

impl<'a> RecordingSink<'a> {
    pub fn new(events: &'a mut Vec<SinkEvent>) -> Self {
        Self {
            events,
            written: HashSet::new(),
        }
    }
}

impl EntrySink for RecordingSink<'_> {
    type Output = ();

    fn write(&mut self, header: &EntryHeader, payload: &mut dyn Read) -> ArchiveResult<()> {
        if !self.written.insert(header.name.clone()) {
            return Err(ArchiveError::DuplicateOutput(header.name.clone()));
        }
        let mut data = Vec::new();
        payload.read_to_end(&mut data)?;
        self.events.push(SinkEvent::Write {
            name: header.name.clone(),
            compression: header.compression,
            data,
        });
        Ok(())
    }

    fn close(self) -> ArchiveResult<()> {
        self.events.push(SinkEvent::Close);
        Ok(())
    }
}
