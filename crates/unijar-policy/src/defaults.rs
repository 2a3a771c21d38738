//! The built-in rule set for combining Java archives.

use crate::matcher::Matcher;
use crate::rule::{PolicyRule, StrategyKind};

/// Per-input signature files. Signatures never survive a merge.
const SIGNATURE_GLOBS: [&str; 4] = [
    "META-INF/*.SF",
    "META-INF/*.DSA",
    "META-INF/*.RSA",
    "META-INF/*.EC",
];

/// Text resources that several libraries each contribute a piece of.
const CONCATENATED: [&str; 3] = [
    "reference.conf",
    "META-INF/spring.handlers",
    "META-INF/spring.schemas",
];

/// Build the default rule list.
///
/// With `reject_duplicates`, the catch-all becomes `copy-first-unique`, so
/// any collision not covered by a more specific rule fails the merge.
pub fn default_rules(reject_duplicates: bool) -> Vec<PolicyRule> {
    let mut rules = Vec::with_capacity(SIGNATURE_GLOBS.len() + CONCATENATED.len() + 3);

    // Directory entries first, so no content rule sees them.
    rules.push(PolicyRule::new(
        Matcher::Suffix("/".to_string()),
        StrategyKind::CopyFirst,
    ));
    rules.push(PolicyRule::new(
        glob_matcher("META-INF/services/**"),
        StrategyKind::MergeLines,
    ));
    for pattern in SIGNATURE_GLOBS {
        rules.push(PolicyRule::new(glob_matcher(pattern), StrategyKind::Skip));
    }
    for name in CONCATENATED {
        rules.push(
            PolicyRule::new(Matcher::Exact(name.to_string()), StrategyKind::Concatenate)
                .with_terminator("\n"),
        );
    }
    rules.push(PolicyRule::new(Matcher::Any, StrategyKind::CopyFirst).warn_duplicates());

    if reject_duplicates {
        reject_duplicate_entries(&mut rules);
    }
    rules
}

/// Turn a `copy-first` catch-all into `copy-first-unique`.
///
/// Only the first catch-all is touched, and only when it copies; a catch-all
/// that skips or merges already decides what happens to collisions.
pub fn reject_duplicate_entries(rules: &mut [PolicyRule]) {
    if let Some(rule) = rules.iter_mut().find(|rule| rule.matcher.is_catch_all()) {
        if rule.strategy == StrategyKind::CopyFirst {
            rule.strategy = StrategyKind::CopyFirstUnique;
            rule.warn_duplicates = false;
        }
    }
}

fn glob_matcher(pattern: &str) -> Matcher {
    // Fixed patterns; an invalid one degrades to an exact match.
    match glob::Pattern::new(pattern) {
        Ok(pattern) => Matcher::Glob(pattern),
        Err(_) => Matcher::Exact(pattern.to_string()),
    }
}
