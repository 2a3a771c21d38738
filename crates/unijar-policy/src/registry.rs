use unijar_types::EntryName;

use crate::error::{PolicyError, PolicyResult};
use crate::rule::PolicyRule;

/// Domain prefix mixed into the policy fingerprint.
const FINGERPRINT_DOMAIN: &str = "unijar-policy-v1";

/// A validated, ordered list of policy rules.
///
/// The only constructor is [`PolicyRegistry::new`], so a registry in hand
/// always has at least one rule, a catch-all, and option sets that apply
/// to their strategies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyRegistry {
    rules: Vec<PolicyRule>,
    /// Index of the first catch-all rule. Rules after it are unreachable.
    catch_all: usize,
}

impl PolicyRegistry {
    /// Validate `rules` and build a registry.
    pub fn new(rules: Vec<PolicyRule>) -> PolicyResult<Self> {
        if rules.is_empty() {
            return Err(PolicyError::NoRules);
        }
        for (index, rule) in rules.iter().enumerate() {
            rule.validate(index)?;
        }
        let catch_all = rules
            .iter()
            .position(|rule| rule.matcher.is_catch_all())
            .ok_or(PolicyError::NoCatchAll)?;

        for (index, rule) in rules.iter().enumerate().skip(catch_all + 1) {
            tracing::warn!(
                rule = index,
                matcher = %rule.matcher,
                catch_all,
                "rule follows the catch-all and can never match"
            );
        }

        let registry = Self { rules, catch_all };
        tracing::debug!(
            rules = registry.rules.len(),
            fingerprint = %registry.fingerprint_hex(),
            "policy registry built"
        );
        Ok(registry)
    }

    /// The rule governing `name`: the first match in registration order.
    pub fn classify(&self, name: &EntryName) -> &PolicyRule {
        &self.rules[self.position(name)]
    }

    /// Index of the rule governing `name`.
    pub fn position(&self, name: &EntryName) -> usize {
        self.rules[..self.catch_all]
            .iter()
            .position(|rule| rule.matcher.matches(name))
            .unwrap_or(self.catch_all)
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always `false`; a registry holds at least one rule.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Index of the first catch-all rule.
    pub fn catch_all_index(&self) -> usize {
        self.catch_all
    }

    /// Rules that can never be selected because they follow the catch-all.
    pub fn unreachable(&self) -> &[PolicyRule] {
        &self.rules[self.catch_all + 1..]
    }

    /// BLAKE3 hash of the JSON-serialized rule list.
    ///
    /// Two registries with the same fingerprint classify every name the same
    /// way and apply the same options.
    pub fn fingerprint(&self) -> [u8; 32] {
        let data = match serde_json::to_vec(&self.rules) {
            Ok(data) => data,
            Err(_) => return [0u8; 32],
        };
        let mut hasher = blake3::Hasher::new();
        hasher.update(FINGERPRINT_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(&data);
        *hasher.finalize().as_bytes()
    }

    /// [`fingerprint`](Self::fingerprint) as lowercase hex.
    pub fn fingerprint_hex(&self) -> String {
        blake3::Hash::from(self.fingerprint()).to_hex().to_string()
    }
}
