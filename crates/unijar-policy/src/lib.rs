//! Policy registry for unijar.
//!
//! A policy is an ordered list of rules. Each rule pairs a [`Matcher`] over
//! entry names with the [`StrategyKind`] that resolves every occurrence of a
//! matching name. The first matching rule wins, and every policy must end in
//! a catch-all so no name goes unclassified.
//!
//! # Quick Start
//!
//! ```rust
//! use unijar_policy::{default_rules, PolicyRegistry, StrategyKind};
//! use unijar_types::EntryName;
//!
//! let registry = PolicyRegistry::new(default_rules(false)).unwrap();
//! let name = EntryName::new("META-INF/services/java.sql.Driver").unwrap();
//! assert_eq!(registry.classify(&name).strategy, StrategyKind::MergeLines);
//! ```

pub mod defaults;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod rule;

pub use defaults::{default_rules, reject_duplicate_entries};
pub use error::{PolicyError, PolicyResult};
pub use matcher::Matcher;
pub use registry::PolicyRegistry;
pub use rule::{PolicyRule, StrategyKind};
