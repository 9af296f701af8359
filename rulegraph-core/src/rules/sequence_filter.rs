use crate::config::SequenceFilterConfig;
use crate::types::ParsedFragment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

// SequenceFilterRule - rejects rule codes whose stem breaks the document's
// monotonic progression.
//
// The extractor's marker state can attach a stale or cross-referenced code to
// a fragment (prose like "see 4.9.1 to 4.9.3" followed by a line starting with
// "(1)"). In a well-formed regulatory document stems appear in non-decreasing
// order, so a stem that leaps far ahead, or recurs after a later stem was
// accepted, is not trusted as structural evidence.
pub struct SequenceFilterRule<'a> {
    config: &'a SequenceFilterConfig,
}

/// A coded fragment the filter refused to trust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedCode {
    pub index: usize,
    pub code: String,
    pub rank: usize,
    /// Highest accepted rank at the time, `None` before the first acceptance
    pub high_water_mark: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceFilterResult {
    /// Indices of fragments whose code is trustworthy
    pub trustworthy: BTreeSet<usize>,
    pub rejected: Vec<RejectedCode>,
    /// Natural-order rank of every distinct stem
    pub stem_ranks: BTreeMap<String, usize>,
}

impl SequenceFilterResult {
    pub fn is_trustworthy(&self, index: usize) -> bool {
        self.trustworthy.contains(&index)
    }
}

impl<'a> SequenceFilterRule<'a> {
    pub fn new(config: &'a SequenceFilterConfig) -> Self {
        Self { config }
    }

    pub fn apply(&self, fragments: &[ParsedFragment]) -> SequenceFilterResult {
        // STEP 1: Collect distinct stems
        let distinct: BTreeSet<&str> = fragments
            .iter()
            .filter_map(|f| f.code.as_ref())
            .map(|code| code.stem.as_str())
            .collect();

        // STEP 2: Rank them in natural order
        let stem_ranks = rank_stems(distinct);

        // STEP 3: Sweep in document order, tracking the high-water mark
        let tolerance = self.config.forward_tolerance;
        let mut high_water_mark: Option<usize> = None;
        let mut result = SequenceFilterResult::default();

        for fragment in fragments {
            let Some(code) = &fragment.code else {
                continue;
            };
            let Some(&rank) = stem_ranks.get(&code.stem) else {
                continue;
            };

            // The mark starts one below rank 0, so the first code must land in [0, K)
            let accepted = match high_water_mark {
                None => rank < tolerance,
                Some(hwm) => rank >= hwm && rank <= hwm.saturating_add(tolerance),
            };

            if accepted {
                result.trustworthy.insert(fragment.index);
                high_water_mark = Some(high_water_mark.map_or(rank, |hwm| hwm.max(rank)));
            } else {
                let raw = fragment.raw_code.clone().unwrap_or_default();
                debug!(
                    index = fragment.index,
                    code = %raw,
                    rank,
                    hwm = ?high_water_mark,
                    "Skipping out-of-order rule code"
                );
                result.rejected.push(RejectedCode {
                    index: fragment.index,
                    code: raw,
                    rank,
                    high_water_mark,
                });
            }
        }

        info!(
            "🔢 Sequence filter: {} trustworthy, {} rejected across {} distinct stems",
            result.trustworthy.len(),
            result.rejected.len(),
            stem_ranks.len()
        );

        result.stem_ranks = stem_ranks;
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum StemComponent {
    Number(u64),
    // Non-numeric parts sort after every number
    Text(String),
}

fn stem_sort_key(stem: &str) -> Vec<StemComponent> {
    stem.split('.')
        .map(str::trim)
        .map(|part| match part.parse::<u64>() {
            Ok(n) => StemComponent::Number(n),
            Err(_) => StemComponent::Text(part.to_string()),
        })
        .collect()
}

/// Rank stems by their dot-separated components (`4.2` < `4.10` < `4.10.1`).
/// Equal keys (`4.01` vs `4.1`) fall back to the raw string so ranks stay distinct.
pub fn rank_stems<'s>(stems: impl IntoIterator<Item = &'s str>) -> BTreeMap<String, usize> {
    let mut ordered: Vec<&str> = stems.into_iter().collect();
    ordered.sort_by_cached_key(|stem| (stem_sort_key(stem), stem.to_string()));
    ordered.dedup();

    ordered
        .into_iter()
        .enumerate()
        .map(|(rank, stem)| (stem.to_string(), rank))
        .collect()
}
