use serde::{Deserialize, Deserializer, Serialize};

// ===== INPUT TYPES =====
// Fragments come from the external text/layout extractor, already cleaned of
// headers, footers and margin boilerplate. The engine never reorders them.

/// Classification the extractor assigned to a fragment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FragmentKind {
    /// Carries a rule-code marker (e.g. `4.3.5(1)`)
    Rule,
    /// Plain narrative text
    Text,
    /// A `Note:` block; never anchors a group
    Note,
}

/// One logical block of the source document, in canonical document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    /// Position in document order (contiguous, strictly increasing)
    #[serde(alias = "node_index")]
    pub index: usize,
    /// Rule-code marker recognized by the extractor, if any
    #[serde(
        default,
        alias = "rule_code",
        deserialize_with = "empty_string_as_none"
    )]
    pub raw_code: Option<String>,
    /// Horizontal indentation in page-coordinate units
    #[serde(alias = "x_indent")]
    pub x_offset: f64,
    #[serde(alias = "type")]
    pub kind: FragmentKind,
    /// Fragment prose. Only the reference linker reads it.
    #[serde(default)]
    pub text: String,
}

impl Fragment {
    pub fn rule(index: usize, code: &str, x_offset: f64) -> Self {
        Self {
            index,
            raw_code: Some(code.to_string()),
            x_offset,
            kind: FragmentKind::Rule,
            text: String::new(),
        }
    }

    pub fn text(index: usize, text: &str, x_offset: f64) -> Self {
        Self {
            index,
            raw_code: None,
            x_offset,
            kind: FragmentKind::Text,
            text: text.to_string(),
        }
    }

    pub fn note(index: usize, text: &str, x_offset: f64) -> Self {
        Self {
            kind: FragmentKind::Note,
            ..Self::text(index, text, x_offset)
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// The rule code this fragment contributes as structural evidence.
    /// Only RULE fragments with a non-blank code qualify.
    pub fn rule_code(&self) -> Option<&str> {
        if self.kind != FragmentKind::Rule {
            return None;
        }
        self.raw_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

// The extractor writes `"rule_code": ""` for uncoded blocks
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|code| !code.trim().is_empty()))
}

// ===== RULE CODES =====

/// A rule code split into its dotted stem and bracket segments.
///
/// `4.1.3(1)(a)` parses to stem `4.1.3` and brackets `["1", "a"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCode {
    pub stem: String,
    pub brackets: Vec<String>,
}

impl RuleCode {
    /// Underscore segments of the stem, empty parts dropped (`4.1.3` → `4`, `1`, `3`)
    pub fn stem_segments(&self) -> impl Iterator<Item = &str> {
        self.stem
            .split('.')
            .map(str::trim)
            .filter(|part| !part.is_empty())
    }

    /// Every ancestor id followed by the code's own id.
    ///
    /// `4.1.3(1)(a)` → `4`, `4_1`, `4_1_3`, `4_1_3_1`, `4_1_3_1_a`
    pub fn chain(&self) -> Vec<String> {
        let segments = self.stem_segments().chain(
            self.brackets
                .iter()
                .map(|b| b.trim())
                .filter(|b| !b.is_empty()),
        );

        let mut chain: Vec<String> = Vec::new();
        for segment in segments {
            let id = match chain.last() {
                Some(prev) => format!("{prev}_{segment}"),
                None => segment.to_string(),
            };
            chain.push(id);
        }
        chain
    }

    /// Normalized full id (`4.1.3(1)(a)` → `4_1_3_1_a`). Empty for a code with no segments.
    pub fn full_id(&self) -> String {
        self.chain().pop().unwrap_or_default()
    }
}

/// A fragment after base conversion: its raw code parsed once, up front,
/// so later stages never re-parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFragment {
    pub index: usize,
    pub x_offset: f64,
    pub raw_code: Option<String>,
    /// Present only for RULE fragments with a non-blank code
    pub code: Option<RuleCode>,
}

// ===== OUTPUT TYPES =====

/// A structural group in the reconstructed hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Underscore-joined identifier, e.g. `4_3_5_1`
    pub id: String,
    /// Always `segment_count(id) - 1`
    pub depth: usize,
    /// Smallest fragment index evidencing this group
    #[serde(alias = "first_node_index")]
    pub first_index: usize,
    /// Existence rests on deeper-indented material following the group's own rule
    #[serde(default)]
    pub indent_confirmed: bool,
}

impl Group {
    pub fn new(id: &str, first_index: usize, indent_confirmed: bool) -> Self {
        Self {
            id: id.to_string(),
            depth: group_depth(id),
            first_index,
            indent_confirmed,
        }
    }

    /// Id of the enclosing group, `None` for a root group
    pub fn parent_id(&self) -> Option<&str> {
        parent_id(&self.id)
    }
}

/// Number of underscore segments in an id, minus one.
pub fn group_depth(id: &str) -> usize {
    id.split('_').count().saturating_sub(1)
}

/// Drop the last underscore segment. Root ids have no parent.
pub fn parent_id(id: &str) -> Option<&str> {
    id.rsplit_once('_').map(|(parent, _)| parent)
}

/// Fragment-index range covered by a group's members (both ends inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpan {
    pub first: usize,
    pub last: usize,
}

impl GroupSpan {
    pub fn overlaps(&self, other: &GroupSpan) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}
