use crate::config::IndentConfig;
use crate::types::ParsedFragment;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Clustered horizontal offsets, shallowest first.
///
/// Gives a code-free nesting signal: the extractor sometimes flattens
/// `(b)(i)` to `(i)`, but the `(i)` line is still indented under `(b)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndentBuckets {
    centers: Vec<f64>,
}

impl IndentBuckets {
    /// Greedy clustering: sort distinct offsets, start a new bucket whenever a
    /// value sits more than `tolerance` from the current bucket's representative.
    pub fn from_offsets(offsets: impl IntoIterator<Item = f64>, tolerance: f64) -> Self {
        let mut values: Vec<f64> = offsets.into_iter().collect();
        values.sort_by(f64::total_cmp);
        values.dedup();

        let mut centers: Vec<f64> = Vec::new();
        for x in values {
            match centers.last() {
                Some(&center) if (x - center).abs() <= tolerance => {} // absorbed
                _ => centers.push(x),
            }
        }

        Self { centers }
    }

    pub fn from_fragments(fragments: &[ParsedFragment], config: &IndentConfig) -> Self {
        let buckets = Self::from_offsets(fragments.iter().map(|f| f.x_offset), config.tolerance);
        info!(
            "📐 Indent buckets: {} levels from {} fragments {:?}",
            buckets.len(),
            fragments.len(),
            buckets.centers
        );
        buckets
    }

    /// Index of the closest bucket; ties go to the shallower one.
    pub fn bucket_index(&self, x: f64) -> usize {
        let mut best = 0;
        for (i, center) in self.centers.iter().enumerate() {
            if (x - center).abs() < (x - self.centers[best]).abs() {
                best = i;
            }
        }
        best
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}
