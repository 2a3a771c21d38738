use std::collections::HashSet;

use unijar_policy::{PolicyRule, StrategyKind};
use unijar_types::{EntryName, EntryRecord};

use crate::error::{MergeError, MergeResult};
use crate::resolved::ResolvedEntry;

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

/// Reads the payload of an occurrence from the input that owns it.
///
/// Handed to [`Strategy::accept`] so content strategies can pull bytes while
/// copy strategies leave the payload untouched.
pub trait PayloadReader {
    /// Read the full payload of `record`. Called at most once per record.
    fn read(&mut self, record: &EntryRecord) -> MergeResult<Vec<u8>>;
}

/// Resolves every occurrence of one entry name.
///
/// One instance is created per distinct name, on its first occurrence.
/// `accept` is called once per occurrence in input order, then `finalize`
/// once after all inputs are drained.
pub trait Strategy: Send {
    /// The strategy identifier, used in errors and logs.
    fn kind(&self) -> StrategyKind;

    /// Take one occurrence.
    fn accept(&mut self, record: EntryRecord, payload: &mut dyn PayloadReader) -> MergeResult<()>;

    /// Produce the output entry for this name, or `None` to drop it.
    fn finalize(self: Box<Self>) -> MergeResult<Option<ResolvedEntry>>;
}

/// Create the strategy `rule` selects for `name`.
pub fn instantiate(rule: &PolicyRule, name: EntryName) -> Box<dyn Strategy> {
    match rule.strategy {
        StrategyKind::CopyFirst => Box::new(CopyFirst::new(name, rule.warn_duplicates)),
        StrategyKind::CopyFirstUnique => Box::new(CopyFirstUnique::new(name)),
        StrategyKind::Concatenate => Box::new(Concatenate::new(name, rule.terminator.clone())),
        StrategyKind::MergeLines => Box::new(MergeLines::new(name, rule.sorted)),
        StrategyKind::Skip => Box::new(Skip),
    }
}

// ---------------------------------------------------------------------------
// CopyFirst
// ---------------------------------------------------------------------------

/// Keeps the first occurrence, ignores the rest.
pub struct CopyFirst {
    name: EntryName,
    warn_duplicates: bool,
    first: Option<EntryRecord>,
}

impl CopyFirst {
    pub fn new(name: EntryName, warn_duplicates: bool) -> Self {
        Self {
            name,
            warn_duplicates,
            first: None,
        }
    }
}

impl Strategy for CopyFirst {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CopyFirst
    }

    fn accept(&mut self, record: EntryRecord, _payload: &mut dyn PayloadReader) -> MergeResult<()> {
        let first = match &self.first {
            Some(first) => first,
            None => {
                self.first = Some(record);
                return Ok(());
            }
        };
        if self.warn_duplicates && !first.same_content(&record) {
            tracing::warn!(
                name = %self.name,
                kept = %first.input,
                ignored = %record.input,
                "duplicate entry with different content, keeping the first"
            );
        } else {
            tracing::trace!(name = %self.name, ignored = %record.input, "duplicate entry ignored");
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MergeResult<Option<ResolvedEntry>> {
        Ok(self.first.map(ResolvedEntry::copy))
    }
}

// ---------------------------------------------------------------------------
// CopyFirstUnique
// ---------------------------------------------------------------------------

/// Like [`CopyFirst`], but a second occurrence fails the merge.
pub struct CopyFirstUnique {
    name: EntryName,
    first: Option<EntryRecord>,
}

impl CopyFirstUnique {
    pub fn new(name: EntryName) -> Self {
        Self { name, first: None }
    }
}

impl Strategy for CopyFirstUnique {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CopyFirstUnique
    }

    fn accept(&mut self, record: EntryRecord, _payload: &mut dyn PayloadReader) -> MergeResult<()> {
        match &self.first {
            None => {
                self.first = Some(record);
                Ok(())
            }
            Some(first) => Err(MergeError::DuplicateEntry {
                name: self.name.clone(),
                strategy: self.kind(),
                first: first.input.clone(),
                second: record.input,
            }),
        }
    }

    fn finalize(self: Box<Self>) -> MergeResult<Option<ResolvedEntry>> {
        Ok(self.first.map(ResolvedEntry::copy))
    }
}

// ---------------------------------------------------------------------------
// Concatenate
// ---------------------------------------------------------------------------

/// Joins every occurrence's bytes in input order.
///
/// With a terminator, each non-empty occurrence that does not already end
/// with it gets it appended, the last one included.
pub struct Concatenate {
    name: EntryName,
    terminator: Option<Vec<u8>>,
    data: Vec<u8>,
}

impl Concatenate {
    pub fn new(name: EntryName, terminator: Option<String>) -> Self {
        Self {
            name,
            terminator: terminator.map(String::into_bytes),
            data: Vec::new(),
        }
    }
}

impl Strategy for Concatenate {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Concatenate
    }

    fn accept(&mut self, record: EntryRecord, payload: &mut dyn PayloadReader) -> MergeResult<()> {
        let bytes = payload.read(&record)?;
        if bytes.is_empty() {
            return Ok(());
        }
        self.data.extend_from_slice(&bytes);
        if let Some(terminator) = &self.terminator {
            if !bytes.ends_with(terminator) {
                self.data.extend_from_slice(terminator);
            }
        }
        tracing::trace!(
            name = %self.name,
            input = %record.input,
            bytes = bytes.len(),
            "occurrence appended"
        );
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MergeResult<Option<ResolvedEntry>> {
        Ok(Some(ResolvedEntry::synthetic(self.name, self.data)))
    }
}

// ---------------------------------------------------------------------------
// MergeLines
// ---------------------------------------------------------------------------

/// Unions line-oriented key listings such as service registrations.
///
/// Each occurrence is UTF-8 text with one key per line. `#` starts a comment
/// that runs to the end of the line; blank lines are ignored. A key with
/// whitespace inside it is malformed.
pub struct MergeLines {
    name: EntryName,
    sorted: bool,
    keys: Vec<String>,
    seen: HashSet<String>,
}

impl MergeLines {
    pub fn new(name: EntryName, sorted: bool) -> Self {
        Self {
            name,
            sorted,
            keys: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn malformed(&self, record: &EntryRecord, reason: String) -> MergeError {
        MergeError::MalformedPayload {
            name: self.name.clone(),
            input: record.input.clone(),
            strategy: self.kind(),
            reason,
        }
    }
}

impl Strategy for MergeLines {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MergeLines
    }

    fn accept(&mut self, record: EntryRecord, payload: &mut dyn PayloadReader) -> MergeResult<()> {
        let bytes = payload.read(&record)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| self.malformed(&record, format!("not valid UTF-8: {e}")))?;

        for (number, line) in text.lines().enumerate() {
            let key = line.split('#').next().unwrap_or_default().trim();
            if key.is_empty() {
                continue;
            }
            if key.contains(char::is_whitespace) {
                return Err(self.malformed(
                    &record,
                    format!("line {}: {key:?} contains whitespace", number + 1),
                ));
            }
            if self.seen.insert(key.to_string()) {
                self.keys.push(key.to_string());
            }
        }
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> MergeResult<Option<ResolvedEntry>> {
        if self.sorted {
            self.keys.sort();
        }
        let mut data = Vec::new();
        for key in &self.keys {
            data.extend_from_slice(key.as_bytes());
            data.push(b'\n');
        }
        Ok(Some(ResolvedEntry::synthetic(self.name, data)))
    }
}

// ---------------------------------------------------------------------------
// Skip
// ---------------------------------------------------------------------------

/// Drops the name from the output.
pub struct Skip;

impl Strategy for Skip {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Skip
    }

    fn accept(&mut self, _record: EntryRecord, _payload: &mut dyn PayloadReader) -> MergeResult<()> {
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MergeResult<Option<ResolvedEntry>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use unijar_types::{Compression, InputId};

    use super::*;
    use crate::resolved::Payload;

    /// Serves payloads from a map and records which records were read.
    #[derive(Default)]
    struct MapReader {
        payloads: HashMap<(usize, usize), Vec<u8>>,
        reads: Vec<(usize, usize)>,
    }

    impl PayloadReader for MapReader {
        fn read(&mut self, record: &EntryRecord) -> MergeResult<Vec<u8>> {
            let key = (record.input.position(), record.index);
            self.reads.push(key);
            Ok(self.payloads.get(&key).cloned().unwrap_or_default())
        }
    }

    fn occurrence(reader: &mut MapReader, input: usize, name: &str, data: &[u8]) -> EntryRecord {
        let index = reader.payloads.len();
        reader.payloads.insert((input, index), data.to_vec());
        EntryRecord {
            name: EntryName::new(name).unwrap(),
            input: InputId::new(input, format!("in{input}.jar")),
            index,
            size: data.len() as u64,
            crc32: simple_checksum(data),
            compression: Compression::Deflated,
        }
    }

    // Content fingerprint stand-in; only equality matters to `same_content`.
    fn simple_checksum(data: &[u8]) -> u32 {
        data.iter()
            .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(*b as u32))
    }

    fn run(
        mut strategy: Box<dyn Strategy>,
        reader: &mut MapReader,
        records: Vec<EntryRecord>,
    ) -> MergeResult<Option<ResolvedEntry>> {
        for record in records {
            strategy.accept(record, reader)?;
        }
        strategy.finalize()
    }

    fn bytes(entry: &ResolvedEntry) -> &[u8] {
        match &entry.payload {
            Payload::Bytes(data) => data,
            Payload::Source(_) => panic!("expected synthetic payload"),
        }
    }

    fn name(s: &str) -> EntryName {
        EntryName::new(s).unwrap()
    }

    #[test]
    fn copy_first_keeps_first_without_reading() {
        let mut reader = MapReader::default();
        let a = occurrence(&mut reader, 0, "y", b"1");
        let b = occurrence(&mut reader, 1, "y", b"2");
        let entry = run(Box::new(CopyFirst::new(name("y"), true)), &mut reader, vec![a.clone(), b])
            .unwrap()
            .unwrap();
        assert_eq!(entry.payload, Payload::Source(a));
        assert!(reader.reads.is_empty());
    }

    #[test]
    fn copy_first_unique_rejects_second() {
        let mut reader = MapReader::default();
        let a = occurrence(&mut reader, 0, "y", b"1");
        let b = occurrence(&mut reader, 1, "y", b"1");
        let err = run(Box::new(CopyFirstUnique::new(name("y"))), &mut reader, vec![a, b]).unwrap_err();
        match err {
            MergeError::DuplicateEntry {
                name,
                strategy,
                first,
                second,
            } => {
                assert_eq!(name.as_str(), "y");
                assert_eq!(strategy, StrategyKind::CopyFirstUnique);
                assert_eq!(first.position(), 0);
                assert_eq!(second.position(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn concatenate_joins_in_order() {
        let mut reader = MapReader::default();
        let records = vec![
            occurrence(&mut reader, 0, "c", b"a"),
            occurrence(&mut reader, 1, "c", b"b"),
            occurrence(&mut reader, 2, "c", b"c"),
        ];
        let entry = run(Box::new(Concatenate::new(name("c"), None)), &mut reader, records)
            .unwrap()
            .unwrap();
        assert_eq!(bytes(&entry), b"abc");
        assert_eq!(entry.compression, Compression::Deflated);
    }

    #[test]
    fn concatenate_terminator_only_when_missing() {
        let mut reader = MapReader::default();
        let records = vec![
            occurrence(&mut reader, 0, "c", b"a\n"),
            occurrence(&mut reader, 1, "c", b""),
            occurrence(&mut reader, 2, "c", b"b"),
        ];
        let entry = run(
            Box::new(Concatenate::new(name("c"), Some("\n".into()))),
            &mut reader,
            records,
        )
        .unwrap()
        .unwrap();
        assert_eq!(bytes(&entry), b"a\nb\n");
    }

    #[test]
    fn merge_lines_unions_and_dedupes() {
        let mut reader = MapReader::default();
        let records = vec![
            occurrence(&mut reader, 0, "s", b"# header\ncom.b.Impl\n\ncom.a.Impl # trailing\n"),
            occurrence(&mut reader, 1, "s", b"com.a.Impl\r\ncom.c.Impl"),
        ];
        let entry = run(Box::new(MergeLines::new(name("s"), false)), &mut reader, records)
            .unwrap()
            .unwrap();
        assert_eq!(bytes(&entry), b"com.b.Impl\ncom.a.Impl\ncom.c.Impl\n");
    }

    #[test]
    fn merge_lines_sorted() {
        let mut reader = MapReader::default();
        let records = vec![
            occurrence(&mut reader, 0, "s", b"b\na\n"),
            occurrence(&mut reader, 1, "s", b"c\na\n"),
        ];
        let entry = run(Box::new(MergeLines::new(name("s"), true)), &mut reader, records)
            .unwrap()
            .unwrap();
        assert_eq!(bytes(&entry), b"a\nb\nc\n");
    }

    #[test]
    fn merge_lines_rejects_inner_whitespace() {
        let mut reader = MapReader::default();
        let record = occurrence(&mut reader, 3, "s", b"ok\ncom.a Impl\n");
        let err = run(Box::new(MergeLines::new(name("s"), false)), &mut reader, vec![record])
            .unwrap_err();
        match err {
            MergeError::MalformedPayload { input, reason, .. } => {
                assert_eq!(input.position(), 3);
                assert!(reason.starts_with("line 2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merge_lines_rejects_invalid_utf8() {
        let mut reader = MapReader::default();
        let record = occurrence(&mut reader, 0, "s", &[0xff, 0xfe, b'\n']);
        let err = run(Box::new(MergeLines::new(name("s"), false)), &mut reader, vec![record])
            .unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn skip_produces_nothing() {
        let mut reader = MapReader::default();
        let record = occurrence(&mut reader, 0, "META-INF/A.SF", b"sig");
        assert!(run(Box::new(Skip), &mut reader, vec![record]).unwrap().is_none());
        assert!(reader.reads.is_empty());
    }

    #[test]
    fn instantiate_follows_rule() {
        for kind in StrategyKind::ALL {
            let rule = PolicyRule::parse("*", kind).unwrap();
            assert_eq!(instantiate(&rule, name("x")).kind(), kind);
        }
    }
}
