//! Error types for TOH

use thiserror::Error;

/// Main error type for TOH
#[derive(Error, Debug)]
pub enum TohError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Uninitialized Q-table entry: {0}")]
    UninitializedEntry(String),

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("MDP has no actions")]
    EmptyActionSet,

    #[error("No successor state: {0}")]
    NoSuccessor(String),
}

/// Result type alias for TOH operations
pub type Result<T> = std::result::Result<T, TohError>;

/// Check that a rate parameter lies in `[0, 1]`
pub fn ensure_unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TohError::InvalidParameter(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}
