//! Error types for chainstate management.

use thiserror::Error;

/// Chainstate errors.
#[derive(Error, Debug)]
pub enum StateError {
    /// A block input refers to a coin that is not in the UTXO set.
    #[error("Coin not found: {0}")]
    MissingCoin(String),

    /// The same coin is spent twice within a block.
    #[error("Coin spent twice in block: {0}")]
    DoubleSpend(String),

    /// A coin is being created over an existing unspent one.
    #[error("Coin already exists: {0}")]
    CoinExists(String),

    /// Block contents are malformed.
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
}

/// Result type for chainstate operations.
pub type StateResult<T> = Result<T, StateError>;
