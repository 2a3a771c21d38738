//! Merge engine for unijar.
//!
//! Combines many input archives into one deterministic output. Entries that
//! share a name across inputs are resolved by the [`Strategy`] the policy
//! selects for that name; the output lists names in the order they were
//! first seen.
//!
//! # Quick Start
//!
//! ```rust
//! use unijar_archive::{MemorySource, RecordingSink};
//! use unijar_merge::MergeConfig;
//!
//! let engine = MergeConfig::default().engine().unwrap();
//! let mut inputs = vec![
//!     MemorySource::from_entries(0, "a.jar", &[("A.class", b"a")]).unwrap(),
//!     MemorySource::from_entries(1, "b.jar", &[("A.class", b"b"), ("B.class", b"b")]).unwrap(),
//! ];
//! let mut events = Vec::new();
//! let (report, ()) = engine.run(&mut inputs, RecordingSink::new(&mut events)).unwrap();
//! assert_eq!(report.entries_written, 2);
//! assert_eq!(report.duplicates_resolved, 1);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod resolved;
pub mod strategy;

pub use config::MergeConfig;
pub use engine::{MergeEngine, MergeReport, DEFAULT_MAX_PAYLOAD_BYTES};
pub use error::{MergeError, MergeResult};
pub use resolved::{Payload, ResolvedEntry};
pub use strategy::{
    instantiate, Concatenate, CopyFirst, CopyFirstUnique, MergeLines, PayloadReader, Skip,
    Strategy,
};
