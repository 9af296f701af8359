//! Fragment-level layout passes.
//!
//! Unlike the group engine these look only at x offsets and fragment kinds,
//! never at rule codes: every fragment (prose and notes included) gets the
//! fragment it visually hangs under, and the top-level heading it sits in.

use crate::config::LayoutConfig;
use crate::types::{Fragment, FragmentKind};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Indentation parent of every fragment, keyed by fragment index.
///
/// Walks the fragments in order with a stack of open ancestors: anything at
/// the same or a deeper offset than the current fragment is closed, and the
/// fragment left on top is the parent. Fragments at the shallowest open
/// offset get `None`.
pub fn assign_parents(fragments: &[Fragment]) -> BTreeMap<usize, Option<usize>> {
    let mut stack: Vec<(f64, usize)> = Vec::new();
    let mut parents = BTreeMap::new();

    for fragment in fragments {
        while stack.last().is_some_and(|(x, _)| *x >= fragment.x_offset) {
            stack.pop();
        }
        let parent = stack.last().map(|(_, index)| *index);
        parents.insert(fragment.index, parent);
        stack.push((fragment.x_offset, fragment.index));
    }

    let roots = parents.values().filter(|p| p.is_none()).count();
    info!(
        "🌳 Parent assignment: {} fragments, {} at the outer margin",
        parents.len(),
        roots
    );
    parents
}

/// Whether a fragment sits on the top-level heading margin.
pub fn is_top_level(fragment: &Fragment, layout: &LayoutConfig) -> bool {
    (fragment.x_offset - layout.top_level_indent).abs() <= layout.top_level_tolerance
}

/// Current top-level heading for every fragment, keyed by fragment index.
///
/// A non-NOTE fragment on the heading margin opens a new top-level section
/// and is its own heading. Notes on the margin do not. Fragments before the
/// first heading get `None`.
pub fn assign_top_level(
    fragments: &[Fragment],
    layout: &LayoutConfig,
) -> BTreeMap<usize, Option<usize>> {
    let mut current: Option<usize> = None;
    let mut headings = 0;
    let mut top_level = BTreeMap::new();

    for fragment in fragments {
        if is_top_level(fragment, layout) && fragment.kind != FragmentKind::Note {
            debug!(index = fragment.index, x = fragment.x_offset, "Top-level heading");
            current = Some(fragment.index);
            headings += 1;
        }
        top_level.insert(fragment.index, current);
    }

    info!(
        "📑 Top-level assignment: {} headings at x={:.1}±{:.1}",
        headings, layout.top_level_indent, layout.top_level_tolerance
    );
    top_level
}
