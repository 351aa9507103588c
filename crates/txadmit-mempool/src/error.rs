//! Error types for the mempool.

use thiserror::Error;
use txadmit_consensus::{OutPoint, Txid};

/// Mempool errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    /// Transaction already exists in mempool.
    #[error("Transaction already in mempool: {0}")]
    AlreadyExists(Txid),

    /// Double spend detected.
    #[error("Double spend detected: input {0} already spent")]
    DoubleSpend(OutPoint),

    /// Transaction too large.
    #[error("Transaction too large: {size} vbytes, max {max} vbytes")]
    TooLarge { size: usize, max: usize },

    /// Mempool full.
    #[error("Mempool full: {count} transactions, max {max}")]
    Full { count: usize, max: usize },

    /// Fee too low.
    #[error("Fee too low: {fee}, minimum {min}")]
    FeeTooLow { fee: u64, min: u64 },

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    NotFound(Txid),
}

impl MempoolError {
    /// Short reject reason reported to admission callers.
    pub fn reject_reason(&self) -> &'static str {
        match self {
            MempoolError::AlreadyExists(_) => "txn-already-in-mempool",
            MempoolError::DoubleSpend(_) => "txn-mempool-conflict",
            MempoolError::TooLarge { .. } => "tx-size",
            MempoolError::Full { .. } => "mempool full",
            MempoolError::FeeTooLow { .. } => "mempool min fee not met",
            MempoolError::NotFound(_) => "txn-not-in-mempool",
        }
    }
}

/// Result type for mempool operations.
pub type MempoolResult<T> = Result<T, MempoolError>;
