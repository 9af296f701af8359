use crate::types::{Group, GroupSpan, ParsedFragment};
use std::collections::{BTreeMap, BTreeSet};

/// Fragment-index range covered by each group's trustworthy members.
///
/// Groups with no members get no entry. Where a span ends in the rendered
/// document (trailing prose, notes) is left to the consumer.
pub fn group_spans(
    groups: &[Group],
    fragments: &[ParsedFragment],
    trustworthy: &BTreeSet<usize>,
) -> BTreeMap<String, GroupSpan> {
    let mut spans: BTreeMap<String, GroupSpan> = BTreeMap::new();
    let ids: BTreeSet<&str> = groups.iter().map(|g| g.id.as_str()).collect();

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
        for prefix in prefixes.filter(|p| ids.contains(p)) {
            spans
                .entry(prefix.to_string())
                .and_modify(|span| {
                    span.first = span.first.min(fragment.index);
                    span.last = span.last.max(fragment.index);
                })
                .or_insert(GroupSpan {
                    first: fragment.index,
                    last: fragment.index,
                });
        }
    }

    spans
}
