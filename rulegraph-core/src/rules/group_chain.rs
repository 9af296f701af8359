use crate::config::ChainConfig;
use crate::rules::indent_buckets::IndentBuckets;
use crate::types::ParsedFragment;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Registration state of one candidate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub first_index: usize,
    pub indent_confirmed: bool,
}

/// Candidate groups keyed by id. Each id is registered at most once; repeat
/// evidence only lowers `first_index` or sets the confirmation flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRegistry {
    groups: BTreeMap<String, GroupEntry>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, id: &str, first_index: usize) {
        self.groups
            .entry(id.to_string())
            .and_modify(|entry| entry.first_index = entry.first_index.min(first_index))
            .or_insert(GroupEntry {
                first_index,
                indent_confirmed: false,
            });
    }

    /// Register `id` (if needed) and mark it as indent-confirmed.
    pub fn confirm(&mut self, id: &str, first_index: usize) {
        self.ensure(id, first_index);
        if let Some(entry) = self.groups.get_mut(id) {
            entry.indent_confirmed = true;
        }
    }

    pub fn get(&self, id: &str) -> Option<&GroupEntry> {
        self.groups.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<GroupEntry> {
        self.groups.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, GroupEntry> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// GroupChainBuilder - registers candidate groups from trustworthy rule codes.
//
// Two sources of evidence:
// 1. Code chain: `4.1.3(1)(a)` proves 4, 4_1, 4_1_3 and 4_1_3_1 exist. The
//    code itself is a leaf until proven otherwise.
// 2. Indentation: if the next trustworthy rule within the lookahead window sits
//    in a deeper indent bucket, the code's own id heads a group even when its
//    children's codes were flattened by the extractor.
pub struct GroupChainBuilder<'a> {
    config: &'a ChainConfig,
    buckets: &'a IndentBuckets,
    trustworthy: &'a BTreeSet<usize>,
}

impl<'a> GroupChainBuilder<'a> {
    pub fn new(
        config: &'a ChainConfig,
        buckets: &'a IndentBuckets,
        trustworthy: &'a BTreeSet<usize>,
    ) -> Self {
        Self {
            config,
            buckets,
            trustworthy,
        }
    }

    pub fn build(&self, fragments: &[ParsedFragment]) -> GroupRegistry {
        let mut registry = GroupRegistry::new();
        let mut confirmed = 0;

        for (position, fragment) in fragments.iter().enumerate() {
            let Some(code) = &fragment.code else {
                continue;
            };
            if !self.trustworthy.contains(&fragment.index) {
                continue;
            }

            let chain = code.chain();
            let Some((own_id, ancestors)) = chain.split_last() else {
                continue;
            };

            for id in ancestors {
                registry.ensure(id, fragment.index);
            }

            if let Some(next) = self.next_trustworthy_rule(fragments, position) {
                let current_bucket = self.buckets.bucket_index(fragment.x_offset);
                let next_bucket = self.buckets.bucket_index(next.x_offset);
                if next_bucket > current_bucket {
                    debug!(
                        group = %own_id,
                        index = fragment.index,
                        child = next.index,
                        "Indent confirms group ({current_bucket} → {next_bucket})"
                    );
                    registry.confirm(own_id, fragment.index);
                    confirmed += 1;
                }
            }
        }

        info!(
            "🔗 Chain builder: {} candidate groups ({} indent confirmations)",
            registry.len(),
            confirmed
        );
        registry
    }

    fn next_trustworthy_rule<'f>(
        &self,
        fragments: &'f [ParsedFragment],
        position: usize,
    ) -> Option<&'f ParsedFragment> {
        fragments
            .get(position + 1..)?
            .iter()
            .take(self.config.lookahead_window)
            .find(|f| f.code.is_some() && self.trustworthy.contains(&f.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentConfig;
    use crate::rules::code_parser::CodeParser;
    use crate::types::Fragment;

    fn build(fragments: &[Fragment], window: usize) -> GroupRegistry {
        let trusted: Vec<usize> = fragments
            .iter()
            .filter(|f| f.rule_code().is_some())
            .map(|f| f.index)
            .collect();
        build_trusting(fragments, window, &trusted)
    }

    fn build_trusting(fragments: &[Fragment], window: usize, trusted: &[usize]) -> GroupRegistry {
        let parsed = CodeParser::default().parse_fragments(fragments);
        let trustworthy: BTreeSet<usize> = trusted.iter().copied().collect();
        let buckets = IndentBuckets::from_fragments(&parsed, &IndentConfig::default());
        let config = ChainConfig {
            lookahead_window: window,
        };
        GroupChainBuilder::new(&config, &buckets, &trustworthy).build(&parsed)
    }

    #[test]
    fn test_registry_keeps_minimum_first_index() {
        let mut registry = GroupRegistry::new();
        registry.ensure("4_1", 7);
        registry.ensure("4_1", 3);
        registry.ensure("4_1", 9);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("4_1").map(|e| e.first_index), Some(3));
    }

    #[test]
    fn test_confirm_upgrades_existing_entry() {
        let mut registry = GroupRegistry::new();
        registry.ensure("4_1_1", 2);
        registry.confirm("4_1_1", 5);
        assert_eq!(
            registry.get("4_1_1"),
            Some(&GroupEntry {
                first_index: 2,
                indent_confirmed: true
            })
        );
    }

    #[test]
    fn test_chain_registers_ancestors_but_not_leaf() {
        let registry = build(&[Fragment::rule(0, "4.1.3(1)(a)", 90.0)], 5);
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["4", "4_1", "4_1_3", "4_1_3_1"]);
        assert!(registry.iter().all(|(_, e)| e.first_index == 0));
    }

    #[test]
    fn test_deeper_next_rule_confirms_own_id() {
        let fragments = vec![
            Fragment::rule(0, "4.5.2(b)", 125.8),
            Fragment::rule(1, "4.5.2(i)", 150.0),
            Fragment::rule(2, "4.5.2(ii)", 150.0),
        ];
        let registry = build(&fragments, 5);
        let entry = registry.get("4_5_2_b").copied();
        assert_eq!(
            entry,
            Some(GroupEntry {
                first_index: 0,
                indent_confirmed: true
            })
        );
        // Siblings at the same depth confirm nothing
        assert!(!registry.contains("4_5_2_i"));
    }

    #[test]
    fn test_lookahead_skips_uncoded_fragments() {
        let fragments = vec![
            Fragment::rule(0, "4.1.1", 90.0),
            Fragment::text(1, "Narrative wrapped far right", 300.0),
            Fragment::rule(2, "4.1.1(1)", 125.0),
        ];
        let registry = build(&fragments, 5);
        assert!(registry.get("4_1_1").is_some_and(|e| e.indent_confirmed));
    }

    #[test]
    fn test_rejected_deeper_code_does_not_confirm() {
        // 4.9.9 failed the sequence filter; the next trusted rule is a sibling
        let fragments = vec![
            Fragment::rule(0, "4.1.1", 90.0),
            Fragment::rule(1, "4.9.9", 125.0),
            Fragment::rule(2, "4.1.2", 90.0),
        ];
        let registry = build_trusting(&fragments, 5, &[0, 2]);
        assert!(!registry.contains("4_1_1"));
        assert!(!registry.contains("4_9_9"));
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["4", "4_1"]);
    }

    #[test]
    fn test_lookahead_skips_rejected_sibling_code() {
        // The same-level 4.1.5 is untrusted, so the deeper 4.1.1(1) is next
        let fragments = vec![
            Fragment::rule(0, "4.1.1", 90.0),
            Fragment::rule(1, "4.1.5", 90.0),
            Fragment::rule(2, "4.1.1(1)", 125.0),
        ];
        let registry = build_trusting(&fragments, 5, &[0, 2]);
        assert_eq!(
            registry.get("4_1_1"),
            Some(&GroupEntry {
                first_index: 0,
                indent_confirmed: true
            })
        );
    }

    #[test]
    fn test_lookahead_window_is_bounded() {
        let mut fragments = vec![Fragment::rule(0, "4.1.1", 90.0)];
        for i in 1..=5 {
            fragments.push(Fragment::text(i, "Prose", 90.0));
        }
        fragments.push(Fragment::rule(6, "4.1.1(1)", 125.0));

        let registry = build(&fragments, 5);
        // 4_1_1 is still registered as the ancestor of 4.1.1(1), but unconfirmed
        assert_eq!(registry.get("4_1_1").map(|e| e.indent_confirmed), Some(false));

        let registry = build(&fragments, 6);
        assert_eq!(registry.get("4_1_1").map(|e| e.indent_confirmed), Some(true));
    }

    #[test]
    fn test_untrustworthy_codes_register_nothing() {
        let parsed = CodeParser::default().parse_fragments(&[Fragment::rule(0, "4.9.3(1)", 90.0)]);
        let buckets = IndentBuckets::from_fragments(&parsed, &IndentConfig::default());
        let trustworthy = BTreeSet::new();
        let config = ChainConfig::default();
        let registry = GroupChainBuilder::new(&config, &buckets, &trustworthy).build(&parsed);
        assert!(registry.is_empty());
    }
}
