use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use unijar_types::{Compression, EntryName, EntryRecord, InputId};
use zip::{CompressionMethod, ZipArchive};

use crate::error::{ArchiveError, ArchiveResult};
use crate::traits::EntrySource;

/// Reads entries from a zip archive in central-directory order.
pub struct ZipSource<R> {
    input: InputId,
    archive: ZipArchive<R>,
}

impl ZipSource<BufReader<File>> {
    /// Open the archive at `path` as the input at `position`.
    pub fn open(position: usize, path: &Path) -> ArchiveResult<Self> {
        let file = File::open(path)?;
        Self::new(
            InputId::new(position, path.display().to_string()),
            BufReader::new(file),
        )
    }
}

impl<R: Read + Seek> ZipSource<R> {
    /// Wrap any seekable reader. Only the central directory is read here.
    pub fn new(input: InputId, reader: R) -> ArchiveResult<Self> {
        let archive = ZipArchive::new(reader)?;
        tracing::debug!(input = %input, entries = archive.len(), "opened input archive");
        Ok(Self { input, archive })
    }

    fn check_index(&self, index: usize) -> ArchiveResult<()> {
        if index >= self.archive.len() {
            return Err(ArchiveError::EntryOutOfRange {
                input: self.input.to_string(),
                index,
                len: self.archive.len(),
            });
        }
        Ok(())
    }
}

impl<R: Read + Seek> EntrySource for ZipSource<R> {
    fn input(&self) -> &InputId {
        &self.input
    }

    fn len(&self) -> usize {
        self.archive.len()
    }

    fn record(&mut self, index: usize) -> ArchiveResult<EntryRecord> {
        self.check_index(index)?;
        let file = self.archive.by_index_raw(index)?;
        let name = EntryName::new(file.name()).map_err(|source| ArchiveError::InvalidName {
            input: self.input.to_string(),
            index,
            source,
        })?;
        let compression = match file.compression() {
            CompressionMethod::Stored => Compression::Stored,
            // Anything else is decompressed on read and re-deflated on write.
            _ => Compression::Deflated,
        };
        Ok(EntryRecord {
            name,
            input: self.input.clone(),
            index,
            size: file.size(),
            crc32: file.crc32(),
            compression,
        })
    }

    fn open(&mut self, index: usize) -> ArchiveResult<Box<dyn Read + '_>> {
        self.check_index(index)?;
        let file = self.archive.by_index(index)?;
        Ok(Box::new(file))
    }
}
