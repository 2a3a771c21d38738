//! Foundation types for unijar.
//!
//! This crate provides the data model shared by every other unijar crate:
//! what an archive entry is called, which input it came from, and the
//! metadata describing one occurrence of it.
//!
//! # Key Types
//!
//! - **EntryName**: case-sensitive path-like key used for policy dispatch
//! - **InputId**: position and label of one input archive
//! - **Compression**: per-entry store/deflate hint
//! - **EntryRecord**: one occurrence of a name inside one input

pub mod error;
pub mod input;
pub mod name;
pub mod record;

pub use error::TypeError;
pub use input::InputId;
pub use name::EntryName;
pub use record::{Compression, EntryRecord};
