use crate::error::Result;
use crate::types::Fragment;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

// Dotted codes with optional bracket suffixes ("4.4.3", "4.4.3(5)(a)") or a
// lone bracket ("(a)")
const REFERENCE_PATTERN: &str = r"\d+(?:\.\d+)+(?:\([a-zA-Z0-9]+\))*|\([a-zA-Z0-9]+\)";

/// `4.4.3(5)` → `4_4_3_5`
pub fn normalize_reference(reference: &str) -> String {
    reference
        .replace('.', "_")
        .replace('(', "_")
        .replace(')', "")
        .trim_matches('_')
        .to_string()
}

/// Finds rule-code mentions in fragment prose and resolves them to the
/// fragments that carry those codes.
pub struct ReferenceLinker {
    pattern: Regex,
}

impl ReferenceLinker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(REFERENCE_PATTERN)?,
        })
    }

    /// Raw reference strings in a text, deduplicated, in first-seen order.
    pub fn find_references<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut seen = BTreeSet::new();
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|reference| seen.insert(*reference))
            .collect()
    }

    /// Outgoing links per source fragment index. Targets are RULE fragments
    /// whose normalized code matches; when a code repeats, the last fragment
    /// carrying it wins. Self-links are dropped. Fragments without links get
    /// no entry.
    pub fn link(&self, fragments: &[Fragment]) -> BTreeMap<usize, Vec<usize>> {
        let targets: BTreeMap<String, usize> = fragments
            .iter()
            .filter_map(|f| f.rule_code().map(|code| (normalize_reference(code), f.index)))
            .collect();

        let mut links: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for fragment in fragments {
            let resolved: BTreeSet<usize> = self
                .find_references(&fragment.text)
                .into_iter()
                .filter_map(|reference| targets.get(&normalize_reference(reference)).copied())
                .filter(|target| *target != fragment.index)
                .collect();
            if !resolved.is_empty() {
                links.insert(fragment.index, resolved.into_iter().collect());
            }
        }

        let total: usize = links.values().map(Vec::len).sum();
        info!(
            "🔗 Reference linking: {} cross-references from {} fragments",
            total,
            links.len()
        );
        links
    }
}

/// Link references with a freshly built linker.
pub fn link_references(fragments: &[Fragment]) -> Result<BTreeMap<usize, Vec<usize>>> {
    Ok(ReferenceLinker::new()?.link(fragments))
}
