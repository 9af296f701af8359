use crate::config::PruningConfig;
use crate::error::Result;
use crate::rules::group_chain::GroupRegistry;
use crate::types::{group_depth, parent_id, ParsedFragment};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Why a candidate group was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneReason {
    /// One member or fewer: wrapping a lone rule adds no structure
    Singleton,
    /// Roman-numeral leaf segment, an artifact of flattened `(b)(i)` codes
    RomanChain,
    /// Parent was removed, so the group would dangle
    Orphaned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedGroup {
    pub id: String,
    pub reason: PruneReason,
    pub member_count: usize,
}

/// A removal criterion for candidate groups. Indent-confirmed groups are
/// exempt from every rule; the pruner enforces that, not the rule.
pub trait PruneRule {
    fn matches(&self, id: &str, member_count: usize) -> bool;
    fn reason(&self) -> PruneReason;
    fn name(&self) -> &str;
}

pub struct SingletonRule;

impl PruneRule for SingletonRule {
    fn matches(&self, _id: &str, member_count: usize) -> bool {
        member_count <= 1
    }

    fn reason(&self) -> PruneReason {
        PruneReason::Singleton
    }

    fn name(&self) -> &str {
        "SingletonRule"
    }
}

pub struct RomanChainRule {
    pattern: Regex,
}

impl RomanChainRule {
    pub fn new(config: &PruningConfig) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(&config.roman_pattern)?,
        })
    }
}

impl PruneRule for RomanChainRule {
    fn matches(&self, id: &str, _member_count: usize) -> bool {
        let last_segment = id.rsplit('_').next().unwrap_or(id);
        self.pattern.is_match(last_segment)
    }

    fn reason(&self) -> PruneReason {
        PruneReason::RomanChain
    }

    fn name(&self) -> &str {
        "RomanChainRule"
    }
}

/// Count trustworthy members per registered group.
///
/// A fragment is a member of `id` when its full id equals `id` or starts with
/// `id` followed by `_`.
pub fn member_counts(
    registry: &GroupRegistry,
    fragments: &[ParsedFragment],
    trustworthy: &BTreeSet<usize>,
) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = registry.ids().map(|id| (id.to_string(), 0)).collect();

    for fragment in fragments {
        let Some(code) = &fragment.code else {
            continue;
        };
        if !trustworthy.contains(&fragment.index) {
            continue;
        }

        let full = code.full_id();
        let prefixes = full
            .match_indices('_')
            .map(|(at, _)| &full[..at])
            .chain(std::iter::once(full.as_str()));
        for prefix in prefixes {
            if let Some(count) = counts.get_mut(prefix) {
                *count += 1;
            }
        }
    }

    counts
}

pub struct ArtifactPruner {
    rules: Vec<Box<dyn PruneRule + Send + Sync>>,
}

impl ArtifactPruner {
    /// Singleton removal followed by roman-chain removal.
    pub fn new(config: &PruningConfig) -> Result<Self> {
        Ok(Self {
            rules: vec![
                Box::new(SingletonRule),
                Box::new(RomanChainRule::new(config)?),
            ],
        })
    }

    pub fn prune(
        &self,
        registry: &mut GroupRegistry,
        fragments: &[ParsedFragment],
        trustworthy: &BTreeSet<usize>,
    ) -> Vec<PrunedGroup> {
        // STEP 1: Member counts are taken once, before anything is removed
        let counts = member_counts(registry, fragments, trustworthy);
        let mut pruned = Vec::new();

        // STEP 2: First matching rule removes the group
        for (id, &member_count) in &counts {
            let confirmed = registry.get(id).is_some_and(|e| e.indent_confirmed);
            if confirmed {
                continue;
            }
            if let Some(rule) = self.rules.iter().find(|r| r.matches(id, member_count)) {
                debug!(group = %id, member_count, "{} removed group", rule.name());
                registry.remove(id);
                pruned.push(PrunedGroup {
                    id: id.clone(),
                    reason: rule.reason(),
                    member_count,
                });
            }
        }

        // STEP 3: Orphan sweep, shallow to deep so removals cascade
        let mut remaining: Vec<(usize, String)> = registry
            .ids()
            .map(|id| (group_depth(id), id.to_string()))
            .collect();
        remaining.sort();
        for (_, id) in remaining {
            let Some(parent) = parent_id(&id) else {
                continue;
            };
            if registry.contains(parent) {
                continue;
            }
            debug!(group = %id, parent, "Removing orphaned group");
            registry.remove(&id);
            pruned.push(PrunedGroup {
                member_count: counts.get(&id).copied().unwrap_or_default(),
                id,
                reason: PruneReason::Orphaned,
            });
        }

        info!(
            "✂️  Pruner: removed {} groups, {} remain",
            pruned.len(),
            registry.len()
        );
        pruned
    }
}
