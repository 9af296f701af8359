use crate::rules::spans::group_spans;
use crate::types::{group_depth, Group, GroupSpan, ParsedFragment};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

// ValidationRule - structural checks on the emitted group set
//
// The pipeline is built so these never fire; the report exists to catch
// regressions and odd source documents, not to gate the result.
pub struct ValidationRule<'a> {
    fragments: &'a [ParsedFragment],
    trustworthy: &'a BTreeSet<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub quality_score: f32,
    pub total_groups: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssue {
    DuplicateId {
        id: String,
    },
    MissingParent {
        id: String,
        parent: String,
    },
    DepthMismatch {
        id: String,
        depth: usize,
        expected: usize,
    },
    SiblingOverlap {
        first: String,
        second: String,
        first_span: GroupSpan,
        second_span: GroupSpan,
    },
}

impl<'a> ValidationRule<'a> {
    pub fn new(fragments: &'a [ParsedFragment], trustworthy: &'a BTreeSet<usize>) -> Self {
        Self {
            fragments,
            trustworthy,
        }
    }

    pub fn apply(&self, groups: &[Group]) -> ValidationReport {
        let report = self.validate_structure(groups);
        self.log_validation_report(&report);
        report
    }

    fn validate_structure(&self, groups: &[Group]) -> ValidationReport {
        let mut issues = Vec::new();

        // 1. Ids are unique
        self.validate_unique_ids(groups, &mut issues);

        // 2. Every non-root group has its parent
        self.validate_tree_completeness(groups, &mut issues);

        // 3. Depth agrees with the id
        self.validate_depths(groups, &mut issues);

        // 4. Siblings cover disjoint fragment ranges
        self.validate_sibling_spans(groups, &mut issues);

        let total_groups = groups.len();
        let quality_score = if total_groups == 0 {
            1.0
        } else {
            (1.0 - (issues.len() as f32 / total_groups as f32)).max(0.0)
        };

        ValidationReport {
            issues,
            quality_score,
            total_groups,
        }
    }

    fn validate_unique_ids(&self, groups: &[Group], issues: &mut Vec<ValidationIssue>) {
        let mut seen = BTreeSet::new();
        for group in groups {
            if !seen.insert(group.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    id: group.id.clone(),
                });
            }
        }
    }

    fn validate_tree_completeness(&self, groups: &[Group], issues: &mut Vec<ValidationIssue>) {
        let ids: BTreeSet<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        for group in groups {
            if let Some(parent) = group.parent_id() {
                if !ids.contains(parent) {
                    issues.push(ValidationIssue::MissingParent {
                        id: group.id.clone(),
                        parent: parent.to_string(),
                    });
                }
            }
        }
    }

    fn validate_depths(&self, groups: &[Group], issues: &mut Vec<ValidationIssue>) {
        for group in groups {
            let expected = group_depth(&group.id);
            if group.depth != expected {
                issues.push(ValidationIssue::DepthMismatch {
                    id: group.id.clone(),
                    depth: group.depth,
                    expected,
                });
            }
        }
    }

    fn validate_sibling_spans(&self, groups: &[Group], issues: &mut Vec<ValidationIssue>) {
        let spans = group_spans(groups, self.fragments, self.trustworthy);

        // Siblings share a parent; depth-0 groups are siblings of each other
        let mut families: BTreeMap<Option<&str>, Vec<(&str, GroupSpan)>> = BTreeMap::new();
        for group in groups {
            if let Some(span) = spans.get(&group.id) {
                families
                    .entry(group.parent_id())
                    .or_default()
                    .push((group.id.as_str(), *span));
            }
        }

        for siblings in families.values_mut() {
            siblings.sort_by_key(|(id, span)| (span.first, *id));
            for pair in siblings.windows(2) {
                let (first, first_span) = pair[0];
                let (second, second_span) = pair[1];
                if first != second && first_span.overlaps(&second_span) {
                    issues.push(ValidationIssue::SiblingOverlap {
                        first: first.to_string(),
                        second: second.to_string(),
                        first_span,
                        second_span,
                    });
                }
            }
        }
    }

    fn log_validation_report(&self, report: &ValidationReport) {
        info!(
            "🔍 Validation: quality {:.2}/1.00, {} issues across {} groups",
            report.quality_score,
            report.issues.len(),
            report.total_groups
        );

        for issue in &report.issues {
            match issue {
                ValidationIssue::DuplicateId { id } => {
                    warn!("🪞 Duplicate group id: {id}");
                }
                ValidationIssue::MissingParent { id, parent } => {
                    warn!("🏝️  Group {id} has no parent group {parent}");
                }
                ValidationIssue::DepthMismatch {
                    id,
                    depth,
                    expected,
                } => {
                    warn!("📊 Group {id} has depth {depth}, expected {expected}");
                }
                ValidationIssue::SiblingOverlap {
                    first,
                    second,
                    first_span,
                    second_span,
                } => {
                    warn!(
                        "🔀 Sibling groups overlap: {first} [{}..={}] and {second} [{}..={}]",
                        first_span.first, first_span.last, second_span.first, second_span.last
                    );
                }
            }
        }
    }
}
