use crate::config::CodeParserConfig;
use crate::types::{Fragment, ParsedFragment, RuleCode};

/// Splits raw rule-code markers into stem and bracket segments.
///
/// Parsing never fails: anything that doesn't look like `stem(a)(b)` is kept
/// as a bare stem with no bracket segments.
#[derive(Debug, Clone)]
pub struct CodeParser {
    part_prefix: String,
}

impl Default for CodeParser {
    fn default() -> Self {
        Self::new(&CodeParserConfig::default())
    }
}

impl CodeParser {
    pub fn new(config: &CodeParserConfig) -> Self {
        Self {
            part_prefix: config.part_prefix.clone(),
        }
    }

    /// `4.1.3(1)(a)` → (`4.1.3`, [`1`, `a`]); `Part 4.1` → (`4.1`, [])
    pub fn parse(&self, raw_code: &str) -> RuleCode {
        let mut rest = raw_code.trim();
        if !self.part_prefix.is_empty() {
            if let Some(stripped) = rest.strip_prefix(self.part_prefix.as_str()) {
                rest = stripped;
            }
        }

        // Peel brackets off the right; they come out innermost-last
        let mut brackets = Vec::new();
        while rest.ends_with(')') {
            let Some(open) = rest.rfind('(') else {
                break;
            };
            brackets.push(rest[open + 1..rest.len() - 1].to_string());
            rest = &rest[..open];
        }
        brackets.reverse();

        RuleCode {
            stem: rest.trim().to_string(),
            brackets,
        }
    }

    /// Base conversion: parse every fragment's code once, keeping document order.
    pub fn parse_fragments(&self, fragments: &[Fragment]) -> Vec<ParsedFragment> {
        fragments
            .iter()
            .map(|fragment| ParsedFragment {
                index: fragment.index,
                x_offset: fragment.x_offset,
                raw_code: fragment.raw_code.clone(),
                code: fragment.rule_code().map(|code| self.parse(code)),
            })
            .collect()
    }
}

/// Normalize a raw code to its full underscore id with the default parser.
///
/// `4.1.3(1)(a)` → `4_1_3_1_a`, `Part 4.1` → `4_1`
pub fn normalize_full(raw_code: &str) -> String {
    CodeParser::default().parse(raw_code).full_id()
}
