//! Error types for consensus primitives.

use thiserror::Error;

/// Consensus primitive errors.
///
/// Validation outcomes are reported through `ValidationState`, not through
/// this type; it only covers malformed input data.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// Transaction bytes could not be decoded.
    #[error("Transaction decode failed: {0}")]
    Decode(String),
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
