//! Error types for hierarchy inference.
//!
//! Only upstream contract violations surface as errors. Odd rule codes and
//! out-of-sequence markers degrade silently (with a debug trace) instead.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, HierarchyError>;

#[derive(Error, Debug)]
pub enum HierarchyError {
    /// Fragment indices went backwards or repeated
    #[error("fragment index regression at position {position}: index {index} follows {previous}")]
    IndexRegression {
        position: usize,
        previous: usize,
        index: usize,
    },

    /// Fragment indices skipped a value
    #[error("fragment index gap at position {position}: expected {expected}, found {index}")]
    IndexGap {
        position: usize,
        expected: usize,
        index: usize,
    },

    /// NaN or infinite horizontal offset
    #[error("fragment {index} has a non-finite x_offset ({x_offset})")]
    InvalidOffset { index: usize, x_offset: f64 },

    /// A configured regex failed to compile
    #[error("invalid pattern in config: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Stage output could not be serialized for hashing
    #[error("failed to serialize for hashing: {0}")]
    Serialization(#[from] serde_json::Error),
}
