use std::path::Path;

use serde::Deserialize;
use unijar_archive::WriterOptions;
use unijar_policy::{default_rules, reject_duplicate_entries, PolicyRegistry, PolicyRule};

use crate::engine::{MergeEngine, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::error::{MergeError, MergeResult};

/// Everything a merge needs besides its inputs and output.
///
/// Loaded from a TOML file:
///
/// ```toml
/// max_payload_bytes = 1048576
///
/// [output]
/// compression = "deflate"
/// timestamp = "2010-01-01 00:00:00"
///
/// [[rule]]
/// match = "META-INF/services/**"
/// strategy = "merge-lines"
///
/// [[rule]]
/// match = "*"
/// strategy = "copy-first"
/// ```
///
/// A file without any `[[rule]]` table uses the default rules.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Policy rules in evaluation order.
    #[serde(rename = "rule", default = "default_policy")]
    pub rules: Vec<PolicyRule>,
    /// Output archive settings.
    #[serde(default)]
    pub output: WriterOptions,
    /// Cap on a single payload read into memory by a content strategy.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

fn default_policy() -> Vec<PolicyRule> {
    default_rules(false)
}

fn default_max_payload_bytes() -> u64 {
    DEFAULT_MAX_PAYLOAD_BYTES
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            rules: default_policy(),
            output: WriterOptions::default(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl MergeConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> MergeResult<Self> {
        toml::from_str(text).map_err(|e| MergeError::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> MergeResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MergeError::Config(format!("reading {}: {e}", path.display())))?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), rules = config.rules.len(), "loaded merge config");
        Ok(config)
    }

    /// Make the catch-all reject duplicate names instead of keeping the first.
    pub fn reject_duplicates(mut self) -> Self {
        reject_duplicate_entries(&mut self.rules);
        self
    }

    /// Validate the rules.
    pub fn registry(&self) -> MergeResult<PolicyRegistry> {
        Ok(PolicyRegistry::new(self.rules.clone())?)
    }

    /// Validate the rules and build an engine.
    pub fn engine(&self) -> MergeResult<MergeEngine> {
        Ok(MergeEngine::new(self.registry()?).with_max_payload_bytes(self.max_payload_bytes))
    }
}
