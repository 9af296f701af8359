use crate::rules::group_chain::GroupRegistry;
use crate::types::Group;
use tracing::info;

/// Materialize surviving groups, ordered by first appearance then id.
pub fn emit_groups(registry: &GroupRegistry) -> Vec<Group> {
    let mut groups: Vec<Group> = registry
        .iter()
        .map(|(id, entry)| Group::new(id, entry.first_index, entry.indent_confirmed))
        .collect();
    groups.sort_by(|a, b| (a.first_index, &a.id).cmp(&(b.first_index, &b.id)));

    info!("📦 Identified {} groups", groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_first_index_then_id() {
        let mut registry = GroupRegistry::new();
        registry.ensure("4_2", 9);
        registry.ensure("4_1_1", 2);
        registry.ensure("4_1", 2);
        registry.ensure("4", 0);
        registry.confirm("4_1_1_b", 5);

        let groups = emit_groups(&registry);
        let order: Vec<(&str, usize, usize)> = groups
            .iter()
            .map(|g| (g.id.as_str(), g.first_index, g.depth))
            .collect();
        assert_eq!(
            order,
            vec![
                ("4", 0, 0),
                ("4_1", 2, 1),
                ("4_1_1", 2, 2),
                ("4_1_1_b", 5, 3),
                ("4_2", 9, 1),
            ]
        );
        assert!(groups[3].indent_confirmed);
    }

    #[test]
    fn test_empty_registry_emits_nothing() {
        assert!(emit_groups(&GroupRegistry::new()).is_empty());
    }
}
