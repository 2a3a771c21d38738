use std::collections::HashSet;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::NamedTempFile;
use unijar_types::{Compression, EntryName};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ArchiveError, ArchiveResult};
use crate::options::WriterOptions;
use crate::traits::{EntryHeader, EntrySink};

/// Entries at or above this size need zip64 local headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Writer handed to `ZipWriter`.
///
/// `ZipWriter` finalizes the archive when it is dropped. Once the owning
/// [`ZipSink`] is abandoned, writes are swallowed and seeks move a virtual
/// cursor, so that drop-time footer never reaches the destination.
struct GuardedWriter<W> {
    inner: W,
    abandoned: Arc<AtomicBool>,
    position: u64,
    len: u64,
}

impl<W: Seek> GuardedWriter<W> {
    fn new(mut inner: W, abandoned: Arc<AtomicBool>) -> io::Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self {
            inner,
            abandoned,
            position,
            len: position,
        })
    }

    fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }

    fn advance(&mut self, written: usize) {
        self.position = self.position.saturating_add(written as u64);
        self.len = self.len.max(self.position);
    }
}

impl<W: Write + Seek> Write for GuardedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_abandoned() {
            self.advance(buf.len());
            return Ok(buf.len());
        }
        let written = self.inner.write(buf)?;
        self.advance(written);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.is_abandoned() {
            return Ok(());
        }
        self.inner.flush()
    }
}

impl<W: Write + Seek> Seek for GuardedWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if !self.is_abandoned() {
            self.position = self.inner.seek(pos)?;
            if let SeekFrom::End(_) = pos {
                self.len = self.position;
            }
            self.len = self.len.max(self.position);
            return Ok(self.position);
        }
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
        };
        self.position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of archive")
        })?;
        Ok(self.position)
    }
}

/// Writes resolved entries into a zip archive over any seekable writer.
///
/// Every entry gets the same modification time and permissions, so the
/// output depends only on entry order, names, bytes and compression.
/// Dropping the sink without `close` writes no central directory, so the
/// destination never holds a readable archive from an aborted merge.
pub struct ZipSink<W: Write + Seek> {
    zip: Option<ZipWriter<GuardedWriter<W>>>,
    abandoned: Arc<AtomicBool>,
    options: WriterOptions,
    modified: zip::DateTime,
    written: HashSet<EntryName>,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(writer: W, options: WriterOptions) -> ArchiveResult<Self> {
        let modified = options.timestamp.to_zip()?;
        let abandoned = Arc::new(AtomicBool::new(false));
        let guarded = GuardedWriter::new(writer, Arc::clone(&abandoned))?;
        Ok(Self {
            zip: Some(ZipWriter::new(guarded)),
            abandoned,
            options,
            modified,
            written: HashSet::new(),
        })
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.written.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    fn file_options(&self, header: &EntryHeader) -> SimpleFileOptions {
        let method = match self.options.compression.resolve(header.compression) {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        };
        SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(self.modified)
            .unix_permissions(0o644)
            .large_file(header.size >= ZIP64_THRESHOLD)
    }
}

impl<W: Write + Seek> EntrySink for ZipSink<W> {
    type Output = W;

    fn write(&mut self, header: &EntryHeader, payload: &mut dyn Read) -> ArchiveResult<()> {
        if !self.written.insert(header.name.clone()) {
            return Err(ArchiveError::DuplicateOutput(header.name.clone()));
        }
        let options = self.file_options(header);
        let zip = self.zip.as_mut().ok_or(ArchiveError::Finalized)?;

        if header.name.is_dir() {
            let options = SimpleFileOptions::default().last_modified_time(self.modified);
            zip.add_directory(header.name.as_str(), options)?;
            tracing::debug!(name = %header.name, "wrote directory entry");
            return Ok(());
        }

        zip.start_file(header.name.as_str(), options)?;
        let copied = io::copy(payload, zip)?;
        tracing::debug!(
            name = %header.name,
            bytes = copied,
            compression = %self.options.compression.resolve(header.compression),
            "wrote entry"
        );
        Ok(())
    }

    fn close(mut self) -> ArchiveResult<W> {
        let entries = self.written.len();
        let zip = self.zip.take().ok_or(ArchiveError::Finalized)?;
        let guarded = zip.finish()?;
        tracing::debug!(entries, "finalized output archive");
        Ok(guarded.inner)
    }
}

impl<W: Write + Seek> Drop for ZipSink<W> {
    fn drop(&mut self) {
        if self.zip.is_some() {
            self.abandoned.store(true, Ordering::Release);
            tracing::debug!(entries = self.written.len(), "output archive abandoned");
        }
    }
}

/// File-backed sink that only replaces the destination on `close`.
///
/// Entries go to a temporary file next to the destination. `close`
/// finalizes it and renames it over the destination path. If the sink is
/// dropped without `close`, the temporary file is deleted and the
/// destination is left untouched.
pub struct ZipFileSink {
    path: PathBuf,
    inner: ZipSink<BufWriter<NamedTempFile>>,
}

impl ZipFileSink {
    pub fn create(path: &Path, options: WriterOptions) -> ArchiveResult<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".unijar-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tracing::debug!(dest = %path.display(), tmp = %tmp.path().display(), "staging output");
        Ok(Self {
            path: path.to_path_buf(),
            inner: ZipSink::new(BufWriter::new(tmp), options)?,
        })
    }
}

impl EntrySink for ZipFileSink {
    type Output = PathBuf;

    fn write(&mut self, header: &EntryHeader, payload: &mut dyn Read) -> ArchiveResult<()> {
        self.inner.write(header, payload)
    }

    fn close(self) -> ArchiveResult<PathBuf> {
        let buffered = self.inner.close()?;
        let tmp = buffered.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use zip::ZipArchive;

    use super::*;
    use crate::options::{CompressionMode, Timestamp};

    fn header(name: &str, compression: Compression, size: u64) -> EntryHeader {
        EntryHeader {
            name: EntryName::new(name).unwrap(),
            compression,
            size,
        }
    }

    fn write_all(sink: &mut impl EntrySink, entries: &[(&str, &[u8], Compression)]) {
        for (name, data, compression) in entries {
            let mut reader: &[u8] = data;
            sink.write(&header(name, *compression, data.len() as u64), &mut reader)
                .unwrap();
        }
    }

    #[test]
    fn writes_in_call_order() {
        let mut sink = ZipSink::new(Cursor::new(Vec::new()), WriterOptions::default()).unwrap();
        write_all(
            &mut sink,
            &[
                ("z.txt", b"zed", Compression::Deflated),
                ("a/", b"", Compression::Stored),
                ("a/b.txt", b"bee", Compression::Stored),
            ],
        );
        assert_eq!(sink.len(), 3);
        let bytes = sink.close().unwrap().into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["z.txt", "a/", "a/b.txt"]);

        let mut content = String::new();
        archive
            .by_name("a/b.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "bee");
    }

    #[test]
    fn rejects_duplicate_name() {
        let mut sink = ZipSink::new(Cursor::new(Vec::new()), WriterOptions::default()).unwrap();
        write_all(&mut sink, &[("x", b"1", Compression::Stored)]);
        let err = sink
            .write(&header("x", Compression::Stored, 1), &mut &b"2"[..])
            .unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicateOutput(name) if name.as_str() == "x"));
    }

    #[test]
    fn compression_mode_overrides_hint() {
        let options = WriterOptions {
            compression: CompressionMode::Store,
            ..Default::default()
        };
        let mut sink = ZipSink::new(Cursor::new(Vec::new()), options).unwrap();
        write_all(&mut sink, &[("x", b"xxxxxxxxxxxxxxxx", Compression::Deflated)]);
        let bytes = sink.close().unwrap().into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let file = archive.by_index(0).unwrap();
        assert_eq!(file.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn timestamp_is_normalized() {
        let options = WriterOptions {
            timestamp: "2012-03-04 05:06:08".parse::<Timestamp>().unwrap(),
            ..Default::default()
        };
        let mut sink = ZipSink::new(Cursor::new(Vec::new()), options).unwrap();
        write_all(&mut sink, &[("x", b"1", Compression::Deflated)]);
        let bytes = sink.close().unwrap().into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let file = archive.by_index(0).unwrap();
        let modified = file.last_modified().unwrap();
        assert_eq!(modified.year(), 2012);
        assert_eq!(modified.month(), 3);
        assert_eq!(modified.day(), 4);
    }

    #[test]
    fn identical_input_gives_identical_bytes() {
        let run = || {
            let mut sink =
                ZipSink::new(Cursor::new(Vec::new()), WriterOptions::default()).unwrap();
            write_all(
                &mut sink,
                &[
                    ("a", b"alpha alpha alpha", Compression::Deflated),
                    ("b", b"beta", Compression::Stored),
                ],
            );
            sink.close().unwrap().into_inner()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn dropped_sink_writes_no_footer() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("partial.jar");

        drop(ZipSink::new(std::fs::File::create(&dest).unwrap(), WriterOptions::default()).unwrap());
        assert_eq!(std::fs::read(&dest).unwrap().len(), 0);

        {
            let file = std::fs::File::create(&dest).unwrap();
            let mut sink = ZipSink::new(file, WriterOptions::default()).unwrap();
            write_all(
                &mut sink,
                &[
                    ("d/", b"", Compression::Stored),
                    ("d/a.txt", b"alpha alpha alpha", Compression::Deflated),
                    ("b.txt", b"beta", Compression::Stored),
                ],
            );
        }
        let bytes = std::fs::read(&dest).unwrap();
        assert!(ZipArchive::new(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn dropped_sink_mid_entry_writes_no_footer() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("input truncated"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("partial.jar");
        let file = std::fs::File::create(&dest).unwrap();
        let mut sink = ZipSink::new(file, WriterOptions::default()).unwrap();
        write_all(&mut sink, &[("a.txt", b"alpha", Compression::Deflated)]);
        let err = sink
            .write(&header("b.txt", Compression::Deflated, 10), &mut Failing)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
        drop(sink);

        let bytes = std::fs::read(&dest).unwrap();
        assert!(!bytes.is_empty());
        assert!(ZipArchive::new(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn abandoned_writer_tracks_virtual_position() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut guarded = GuardedWriter::new(Cursor::new(Vec::new()), Arc::clone(&flag)).unwrap();
        guarded.write_all(b"head").unwrap();

        flag.store(true, Ordering::Release);
        guarded.write_all(b"footer").unwrap();
        assert_eq!(guarded.stream_position().unwrap(), 10);
        assert_eq!(guarded.seek(SeekFrom::End(-6)).unwrap(), 4);
        assert!(guarded.seek(SeekFrom::Current(-5)).is_err());
        assert_eq!(guarded.inner.into_inner(), b"head");
    }

    #[test]
    fn file_sink_persists_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jar");

        let mut sink = ZipFileSink::create(&dest, WriterOptions::default()).unwrap();
        write_all(&mut sink, &[("x", b"1", Compression::Deflated)]);
        assert!(!dest.exists());

        let path = sink.close().unwrap();
        assert_eq!(path, dest);
        let archive = ZipArchive::new(std::fs::File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn file_sink_dropped_without_close_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jar");

        {
            let mut sink = ZipFileSink::create(&dest, WriterOptions::default()).unwrap();
            write_all(&mut sink, &[("x", b"1", Compression::Deflated)]);
        }

        assert!(!dest.exists());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn file_sink_keeps_existing_destination_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jar");
        std::fs::write(&dest, b"previous build").unwrap();

        drop(ZipFileSink::create(&dest, WriterOptions::default()).unwrap());

        assert_eq!(std::fs::read(&dest).unwrap(), b"previous build");
    }
}
