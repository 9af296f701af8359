use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

// Default value functions for serde
fn default_forward_tolerance() -> usize {
    3 // Max ranks a stem may jump ahead of the high-water mark
}

fn default_indent_tolerance() -> f64 {
    3.0 // x offsets within this distance share an indent bucket
}

fn default_lookahead_window() -> usize {
    5 // Fragments scanned for the next trustworthy rule
}

fn default_roman_pattern() -> String {
    r"^[ivx]+$".to_string()
}

fn default_part_prefix() -> String {
    "Part ".to_string()
}

fn default_top_level_indent() -> f64 {
    90.0 // Left margin of top-level headings (points)
}

fn default_top_level_tolerance() -> f64 {
    1.0
}

/// Tunables for the hierarchy inference pipeline.
///
/// Every field has a serde default, so a YAML file only needs the values it
/// overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HierarchyConfig {
    #[serde(default)]
    pub code: CodeParserConfig,
    #[serde(default)]
    pub sequence: SequenceFilterConfig,
    #[serde(default)]
    pub indent: IndentConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub pruning: PruningConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeParserConfig {
    /// Leading token stripped from part headings ("Part 4.2" → "4.2")
    #[serde(default = "default_part_prefix")]
    pub part_prefix: String,
}

impl Default for CodeParserConfig {
    fn default() -> Self {
        Self {
            part_prefix: default_part_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequenceFilterConfig {
    /// How many stem ranks a code may skip ahead and still be trusted
    #[serde(default = "default_forward_tolerance")]
    pub forward_tolerance: usize,
}

impl Default for SequenceFilterConfig {
    fn default() -> Self {
        Self {
            forward_tolerance: default_forward_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndentConfig {
    /// Offsets closer than this to a bucket's representative join that bucket (points)
    #[serde(default = "default_indent_tolerance")]
    pub tolerance: f64,
}

impl Default for IndentConfig {
    fn default() -> Self {
        Self {
            tolerance: default_indent_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainConfig {
    /// Number of following fragments searched for the next trustworthy rule
    #[serde(default = "default_lookahead_window")]
    pub lookahead_window: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            lookahead_window: default_lookahead_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PruningConfig {
    /// Regex for a roman-numeral final id segment
    #[serde(default = "default_roman_pattern")]
    pub roman_pattern: String,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            roman_pattern: default_roman_pattern(),
        }
    }
}

/// Page-layout constants for the fragment-level passes (parents, top level).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    /// x offset at which a fragment counts as a top-level heading
    #[serde(default = "default_top_level_indent")]
    pub top_level_indent: f64,
    /// Allowed distance from `top_level_indent`, inclusive
    #[serde(default = "default_top_level_tolerance")]
    pub top_level_tolerance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            top_level_indent: default_top_level_indent(),
            top_level_tolerance: default_top_level_tolerance(),
        }
    }
}

impl HierarchyConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: HierarchyConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("⚠️  Failed to load config from {p} ({e}), using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = HierarchyConfig::default();
        assert_eq!(config.sequence.forward_tolerance, 3);
        assert_eq!(config.indent.tolerance, 3.0);
        assert_eq!(config.chain.lookahead_window, 5);
        assert_eq!(config.pruning.roman_pattern, "^[ivx]+$");
        assert_eq!(config.code.part_prefix, "Part ");
        assert_eq!(config.layout.top_level_indent, 90.0);
        assert_eq!(config.layout.top_level_tolerance, 1.0);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sequence:\n  forward_tolerance: 5\nindent:\n  tolerance: 1.5").unwrap();

        let config = HierarchyConfig::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.sequence.forward_tolerance, 5);
        assert_eq!(config.indent.tolerance, 1.5);
        assert_eq!(config.chain.lookahead_window, 5);
        assert_eq!(config.pruning, PruningConfig::default());
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn test_layout_section_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "layout:\n  top_level_indent: 72.0").unwrap();

        let config = HierarchyConfig::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.layout.top_level_indent, 72.0);
        assert_eq!(config.layout.top_level_tolerance, 1.0);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = HierarchyConfig::default();
        config.chain.lookahead_window = 8;
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: HierarchyConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = HierarchyConfig::load_with_fallback(Some("/nonexistent/rulegraph.yaml"));
        assert_eq!(config, HierarchyConfig::default());
    }
}
