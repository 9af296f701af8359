// Rulegraph Core Library
//
// Reconstructs the section hierarchy of scraped regulatory documents from an
// ordered stream of text fragments with noisy rule-code markers.
// Main interface: HierarchyEngine / build_groups.

pub mod config;
pub mod digest;
pub mod error;
pub mod markers;
pub mod parents;
pub mod references;
pub mod rules;
pub mod types;

// Re-export main types and functions for easy use
pub use config::{HierarchyConfig, LayoutConfig};
pub use error::{HierarchyError, Result};
pub use markers::{MarkerLevel, MarkerScanner, MarkerState};
pub use parents::{assign_parents, assign_top_level};
pub use references::{link_references, ReferenceLinker};
pub use rules::{build_groups, check_fragment_order, DebugConfig, HierarchyEngine, HierarchyStages};
pub use types::*;
