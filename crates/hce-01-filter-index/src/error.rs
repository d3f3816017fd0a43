//! Error types for the filter index

use thiserror::Error;

/// Errors raised while validating or compiling polling-loop filters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Filter is empty")]
    Empty,

    #[error("Filter is not hex: {0}")]
    InvalidHex(String),

    #[error("Filter has odd length: {0}")]
    OddLength(String),

    #[error("Invalid pattern filter {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
