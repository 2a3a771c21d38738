use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use serde::Serialize;
use unijar_archive::{read_payload, ArchiveError, EntryHeader, EntrySink, EntrySource};
use unijar_policy::{PolicyRegistry, StrategyKind};
use unijar_types::{EntryName, EntryRecord};

use crate::error::{MergeError, MergeResult};
use crate::resolved::{Payload, ResolvedEntry};
use crate::strategy::{instantiate, PayloadReader, Strategy};

/// Default cap on a single payload read into memory by a content strategy.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// MergeReport
// ---------------------------------------------------------------------------

/// Summary of a completed merge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Number of input archives read.
    pub inputs: usize,
    /// Entry occurrences seen across all inputs.
    pub entries_seen: usize,
    /// Distinct entry names.
    pub distinct_names: usize,
    /// Entries written to the output.
    pub entries_written: usize,
    /// Names whose strategy produced no output entry.
    pub entries_skipped: usize,
    /// Occurrences beyond the first for some name.
    pub duplicates_resolved: usize,
    /// Uncompressed bytes written.
    pub bytes_written: u64,
    /// Distinct names per strategy.
    pub strategies: BTreeMap<String, usize>,
    /// Hex fingerprint of the policy in force.
    pub policy_fingerprint: String,
    /// Wall-clock time for the merge.
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(elapsed.as_millis())
}

// ---------------------------------------------------------------------------
// MergeState
// ---------------------------------------------------------------------------

/// Accumulator for one distinct name, created on its first occurrence.
struct MergeState {
    name: EntryName,
    strategy: Box<dyn Strategy>,
    occurrences: usize,
}

/// [`PayloadReader`] over the input currently being drained.
struct SourceReader<'a, S: EntrySource + ?Sized> {
    source: &'a mut S,
    limit: u64,
}

impl<S: EntrySource + ?Sized> PayloadReader for SourceReader<'_, S> {
    fn read(&mut self, record: &EntryRecord) -> MergeResult<Vec<u8>> {
        read_payload(&mut *self.source, record, self.limit).map_err(|source| match source {
            ArchiveError::PayloadTooLarge { size, limit, .. } => MergeError::PayloadTooLarge {
                name: record.name.clone(),
                input: record.input.clone(),
                size,
                limit,
            },
            source => MergeError::Io {
                name: record.name.clone(),
                input: record.input.clone(),
                source,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// MergeEngine
// ---------------------------------------------------------------------------

/// Combines many inputs into one output in a single pass.
///
/// Inputs are drained in the order given, each in its native entry order.
/// Every distinct name is classified once, on first sight, and all of its
/// occurrences go to the same strategy instance. Once the inputs are
/// exhausted, names are flushed to the sink in first-seen order.
///
/// The engine is **fail-fast**: the first error stops the merge and the sink
/// is dropped without being closed.
pub struct MergeEngine {
    registry: PolicyRegistry,
    max_payload_bytes: u64,
}

impl MergeEngine {
    pub fn new(registry: PolicyRegistry) -> Self {
        Self {
            registry,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Cap on a single payload read into memory.
    pub fn with_max_payload_bytes(mut self, limit: u64) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    /// Merge `sources` into `sink`.
    ///
    /// On success the sink has been closed and its output is returned with
    /// the report.
    pub fn run<S, K>(&self, sources: &mut [S], mut sink: K) -> MergeResult<(MergeReport, K::Output)>
    where
        S: EntrySource,
        K: EntrySink,
    {
        let started = Instant::now();
        let positions = index_positions(sources)?;
        let fingerprint = self.registry.fingerprint_hex();
        tracing::info!(
            inputs = sources.len(),
            policy = %fingerprint,
            "merge started"
        );

        let mut report = MergeReport {
            inputs: sources.len(),
            policy_fingerprint: fingerprint,
            ..Default::default()
        };

        // Pass: every occurrence of every input, in order.
        let mut states: Vec<MergeState> = Vec::new();
        let mut slots: HashMap<EntryName, usize> = HashMap::new();
        for source in sources.iter_mut() {
            tracing::debug!(input = %source.input(), entries = source.len(), "draining input");
            for index in 0..source.len() {
                let record = source.record(index)?;
                report.entries_seen += 1;

                let slot = match slots.get(&record.name) {
                    Some(&slot) => slot,
                    None => {
                        let rule = self.registry.classify(&record.name);
                        tracing::trace!(
                            name = %record.name,
                            input = %record.input,
                            strategy = %rule.strategy,
                            "new entry name"
                        );
                        states.push(MergeState {
                            name: record.name.clone(),
                            strategy: instantiate(rule, record.name.clone()),
                            occurrences: 0,
                        });
                        slots.insert(record.name.clone(), states.len() - 1);
                        states.len() - 1
                    }
                };

                let state = &mut states[slot];
                state.occurrences += 1;
                let mut reader = SourceReader {
                    source: &mut *source,
                    limit: self.max_payload_bytes,
                };
                state.strategy.accept(record, &mut reader)?;
            }
        }
        drop(slots);
        report.distinct_names = states.len();

        // Flush: one resolved entry per name at most, in first-seen order.
        for state in states {
            let kind = state.strategy.kind();
            *report.strategies.entry(kind.to_string()).or_default() += 1;
            report.duplicates_resolved += state.occurrences - 1;

            let Some(entry) = state.strategy.finalize()? else {
                tracing::debug!(name = %state.name, strategy = %kind, "entry dropped");
                report.entries_skipped += 1;
                continue;
            };
            report.bytes_written += entry.size();
            write_entry(sources, &positions, &mut sink, entry, kind)?;
            report.entries_written += 1;
        }

        let output = sink.close()?;
        report.elapsed = started.elapsed();
        tracing::info!(
            entries_seen = report.entries_seen,
            entries_written = report.entries_written,
            entries_skipped = report.entries_skipped,
            duplicates = report.duplicates_resolved,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "merge finished"
        );
        Ok((report, output))
    }
}

/// Map each input position to its slot in `sources`.
fn index_positions<S: EntrySource>(sources: &[S]) -> MergeResult<HashMap<usize, usize>> {
    let mut positions = HashMap::with_capacity(sources.len());
    for (slot, source) in sources.iter().enumerate() {
        let position = source.input().position();
        if let Some(previous) = positions.insert(position, slot) {
            return Err(MergeError::DuplicateInput {
                first: sources[previous].input().clone(),
                second: source.input().clone(),
            });
        }
    }
    Ok(positions)
}

fn write_entry<S, K>(
    sources: &mut [S],
    positions: &HashMap<usize, usize>,
    sink: &mut K,
    entry: ResolvedEntry,
    kind: StrategyKind,
) -> MergeResult<()>
where
    S: EntrySource,
    K: EntrySink,
{
    let header = EntryHeader {
        name: entry.name.clone(),
        compression: entry.compression,
        size: entry.size(),
    };
    tracing::trace!(name = %header.name, strategy = %kind, size = header.size, "writing entry");

    match entry.payload {
        Payload::Bytes(data) => sink.write(&header, &mut data.as_slice())?,
        Payload::Source(record) => {
            let len = sources.len();
            let source = positions
                .get(&record.input.position())
                .and_then(|&slot| sources.get_mut(slot))
                .ok_or_else(|| MergeError::Io {
                    name: record.name.clone(),
                    input: record.input.clone(),
                    source: ArchiveError::EntryOutOfRange {
                        input: record.input.to_string(),
                        index: record.input.position(),
                        len,
                    },
                })?;
            let mut payload = source.open(record.index).map_err(|e| MergeError::Io {
                name: record.name.clone(),
                input: record.input.clone(),
                source: e,
            })?;
            sink.write(&header, &mut payload)?;
        }
    }
    Ok(())
}
