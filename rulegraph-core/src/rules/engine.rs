use crate::config::HierarchyConfig;
use crate::digest::{calculate_config_hash, calculate_groups_hash};
use crate::error::{HierarchyError, Result};
use crate::types::{Fragment, Group, GroupSpan, ParsedFragment};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::code_parser::CodeParser;
use super::emitter::emit_groups;
use super::group_chain::{GroupChainBuilder, GroupRegistry};
use super::indent_buckets::IndentBuckets;
use super::pruning::{ArtifactPruner, PrunedGroup};
use super::sequence_filter::{SequenceFilterResult, SequenceFilterRule};
use super::spans::group_spans;
use super::validation::{ValidationReport, ValidationRule};

// A debug filter pattern, compiled once. Invalid regexes match as substrings.
#[derive(Debug, Clone)]
enum FilterPattern {
    Regex(Regex),
    Substring(String),
}

impl FilterPattern {
    fn compile(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => FilterPattern::Regex(regex),
            Err(_) => FilterPattern::Substring(pattern.to_string()),
        }
    }

    fn is_match(&self, raw_code: &str) -> bool {
        match self {
            FilterPattern::Regex(regex) => regex.is_match(raw_code),
            FilterPattern::Substring(pattern) => raw_code.contains(pattern.as_str()),
        }
    }
}

// Debug configuration for pipeline tracing
#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    filter_patterns: Vec<FilterPattern>,
}

impl DebugConfig {
    pub fn new(enabled: bool, filter_patterns: Vec<String>) -> Self {
        Self {
            enabled,
            filter_patterns: filter_patterns
                .iter()
                .map(|pattern| FilterPattern::compile(pattern))
                .collect(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            filter_patterns: Vec::new(),
        }
    }

    fn matches(&self, raw_code: &str) -> bool {
        self.filter_patterns.iter().any(|pattern| pattern.is_match(raw_code))
    }
}

/// Trace fragments whose raw code matches the debug filter through one stage.
pub fn debug_pipeline_fragments<F>(
    stage: &str,
    fragments: &[ParsedFragment],
    debug_config: &DebugConfig,
    describe: F,
) where
    F: Fn(&ParsedFragment) -> String,
{
    if !debug_config.enabled || debug_config.filter_patterns.is_empty() {
        return;
    }

    let matching: Vec<&ParsedFragment> = fragments
        .iter()
        .filter(|f| f.raw_code.as_deref().is_some_and(|code| debug_config.matches(code)))
        .collect();

    if matching.is_empty() {
        return;
    }

    debug!("🔍 [{stage}] {} matching fragments", matching.len());
    for fragment in matching {
        debug!(
            "  Fragment {}: \"{}\" (x: {:.1}) {}",
            fragment.index,
            fragment.raw_code.as_deref().unwrap_or_default(),
            fragment.x_offset,
            describe(fragment)
        );
    }
}

/// Everything the pipeline computed for one document, stage by stage.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyStages {
    pub fragments: Vec<ParsedFragment>,
    pub sequence: SequenceFilterResult,
    pub buckets: IndentBuckets,
    /// Candidate groups before pruning
    pub registered: GroupRegistry,
    pub pruned: Vec<PrunedGroup>,
    pub groups: Vec<Group>,
    pub spans: BTreeMap<String, GroupSpan>,
    pub validation: ValidationReport,
    pub config_hash: String,
    pub output_hash: String,
}

/// Infers the group hierarchy of a fragment sequence.
///
/// Holds no per-document state: `analyze` borrows `self` immutably, so one
/// engine can serve many documents, across threads if need be.
pub struct HierarchyEngine {
    config: HierarchyConfig,
    parser: CodeParser,
    pruner: ArtifactPruner,
    debug_config: DebugConfig,
}

impl HierarchyEngine {
    pub fn new(config: HierarchyConfig) -> Result<Self> {
        let parser = CodeParser::new(&config.code);
        let pruner = ArtifactPruner::new(&config.pruning)?;

        Ok(Self {
            config,
            parser,
            pruner,
            debug_config: DebugConfig::disabled(),
        })
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.debug_config = debug_config;
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Run the whole pipeline and keep every intermediate result.
    pub fn analyze(&self, fragments: &[Fragment]) -> Result<HierarchyStages> {
        info!("⚙️  Inferring hierarchy for {} fragments", fragments.len());

        // STEP 0: Reject input that breaks the ordering contract
        check_fragment_order(fragments)?;

        // STEP 1: Base conversion (Fragment → ParsedFragment)
        let parsed = self.parser.parse_fragments(fragments);
        debug_pipeline_fragments("BaseConversion", &parsed, &self.debug_config, |f| {
            match &f.code {
                Some(code) => format!("stem: {}, brackets: {:?}", code.stem, code.brackets),
                None => "uncoded".to_string(),
            }
        });

        // STEP 2: Sequential validity filter
        let sequence = SequenceFilterRule::new(&self.config.sequence).apply(&parsed);
        debug_pipeline_fragments("SequenceFilter", &parsed, &self.debug_config, |f| {
            if sequence.is_trustworthy(f.index) {
                "trusted".to_string()
            } else {
                "rejected".to_string()
            }
        });

        // STEP 3: Indent buckets
        let buckets = IndentBuckets::from_fragments(&parsed, &self.config.indent);
        debug_pipeline_fragments("IndentBuckets", &parsed, &self.debug_config, |f| {
            format!("bucket: {}", buckets.bucket_index(f.x_offset))
        });

        // STEP 4: Candidate groups from code chains and indentation
        let mut registry =
            GroupChainBuilder::new(&self.config.chain, &buckets, &sequence.trustworthy)
                .build(&parsed);
        let registered = registry.clone();

        // STEP 5: Drop singleton, roman-chain and orphaned artifacts
        let pruned = self
            .pruner
            .prune(&mut registry, &parsed, &sequence.trustworthy);
        debug_pipeline_fragments("Pruning", &parsed, &self.debug_config, |f| {
            let own_id = f.code.as_ref().map(|c| c.full_id()).unwrap_or_default();
            match registry.get(&own_id) {
                Some(entry) => format!("heads group {own_id} (confirmed: {})", entry.indent_confirmed),
                None => "leaf".to_string(),
            }
        });

        // STEP 6: Emit in (first_index, id) order
        let groups = emit_groups(&registry);

        // STEP 7: Spans and structural validation
        let spans = group_spans(&groups, &parsed, &sequence.trustworthy);
        let validation = ValidationRule::new(&parsed, &sequence.trustworthy).apply(&groups);

        // STEP 8: Digests for idempotence checks
        let config_hash = calculate_config_hash(&self.config)?;
        let output_hash = calculate_groups_hash(&groups)?;

        Ok(HierarchyStages {
            fragments: parsed,
            sequence,
            buckets,
            registered,
            pruned,
            groups,
            spans,
            validation,
            config_hash,
            output_hash,
        })
    }

    /// Groups only.
    pub fn build_groups(&self, fragments: &[Fragment]) -> Result<Vec<Group>> {
        Ok(self.analyze(fragments)?.groups)
    }
}

/// Infer groups with the default configuration.
pub fn build_groups(fragments: &[Fragment]) -> Result<Vec<Group>> {
    HierarchyEngine::new(HierarchyConfig::default())?.build_groups(fragments)
}

/// Indices must be contiguous and strictly increasing, offsets finite.
/// The first index may be any value, so document excerpts are accepted.
pub fn check_fragment_order(fragments: &[Fragment]) -> Result<()> {
    let mut previous: Option<usize> = None;

    for (position, fragment) in fragments.iter().enumerate() {
        if !fragment.x_offset.is_finite() {
            return Err(HierarchyError::InvalidOffset {
                index: fragment.index,
                x_offset: fragment.x_offset,
            });
        }

        if let Some(previous) = previous {
            if fragment.index <= previous {
                return Err(HierarchyError::IndexRegression {
                    position,
                    previous,
                    index: fragment.index,
                });
            }
            if fragment.index != previous + 1 {
                return Err(HierarchyError::IndexGap {
                    position,
                    expected: previous + 1,
                    index: fragment.index,
                });
            }
        }
        previous = Some(fragment.index);
    }

    Ok(())
}
