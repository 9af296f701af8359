// Hierarchy inference stages - one module per pipeline stage:
// - code_parser.rs: raw code → stem + bracket segments
// - sequence_filter.rs: drops out-of-order (stale or cross-referenced) codes
// - indent_buckets.rs: clusters horizontal offsets into nesting levels
// - group_chain.rs: registers candidate groups from code chains and indentation
// - pruning.rs: removes singleton, roman-chain and orphaned artifacts
// - emitter.rs: final (first_index, id) ordering
// - spans.rs / validation.rs: member ranges and structural checks
// - engine.rs: HierarchyEngine running the stages in order

pub mod code_parser;
pub mod emitter;
pub mod engine;
pub mod group_chain;
pub mod indent_buckets;
pub mod pruning;
pub mod sequence_filter;
pub mod spans;
pub mod validation;

pub use engine::*;
