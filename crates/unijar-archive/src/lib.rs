//! Archive collaborators for unijar.
//!
//! The merge engine never touches the container format directly. It reads
//! through [`EntrySource`] and writes through [`EntrySink`]; this crate
//! provides the zip-backed implementations and in-memory doubles.
//!
//! # Architecture
//!
//! - **ZipSource**: one input archive, entries in central-directory order
//! - **ZipSink**: deterministic zip writer over any `Write + Seek`
//! - **ZipFileSink**: stages output in a temp file, renamed into place on close
//! - **MemorySource / RecordingSink**: fixtures that record how they were used

pub mod error;
pub mod memory;
pub mod options;
pub mod reader;
pub mod traits;
pub mod writer;

pub use error::{ArchiveError, ArchiveResult};
pub use memory::{MemoryEntry, MemorySource, RecordingSink, SinkEvent};
pub use options::{CompressionMode, Timestamp, WriterOptions};
pub use reader::ZipSource;
pub use traits::{read_payload, EntryHeader, EntrySink, EntrySource};
pub use writer::{ZipFileSink, ZipSink};

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use unijar_types::{Compression, InputId};

    use super::*;

    #[test]
    fn copy_through_zip_roundtrip() {
        let mut sink = ZipSink::new(Cursor::new(Vec::new()), WriterOptions::default()).unwrap();
        let mut memory =
            MemorySource::from_entries(0, "a.jar", &[("a/", b""), ("a/x.txt", b"ex")]).unwrap();
        for i in 0..memory.len() {
            let record = memory.record(i).unwrap();
            let header = EntryHeader {
                name: record.name.clone(),
                compression: record.compression,
                size: record.size,
            };
            let mut payload = memory.open(i).unwrap();
            sink.write(&header, &mut payload).unwrap();
        }
        let bytes = sink.close().unwrap().into_inner();

        let mut zip = ZipSource::new(InputId::new(0, "out.jar"), Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);
        let dir = zip.record(0).unwrap();
        assert!(dir.name.is_dir());
        let file = zip.record(1).unwrap();
        assert_eq!(file.compression, Compression::Deflated);

        let mut text = String::new();
        zip.open(1).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "ex");
    }
}
