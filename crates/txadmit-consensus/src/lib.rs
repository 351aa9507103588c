//! # txadmit-consensus
//!
//! Transaction primitives and per-transaction validation.
//!
//! This crate provides:
//! - `Transaction` with content (`Txid`) and witness (`Wtxid`) identities
//! - Weight and virtual size accounting
//! - `ValidationState`, the immutable outcome record shared by transaction
//!   and package validation
//! - The `TxValidator` seam and the reference `UtxoValidator`
//! - Layered input views (`CoinsView`, `MempoolView`, `PackageCoins`)

mod error;
mod hash;
mod state;
mod transaction;
mod validator;
mod view;

pub use error::{ConsensusError, ConsensusResult};
pub use hash::{blake2b256, BlockHash, Txid, Wtxid, HASH_LENGTH};
pub use state::{TxValidationResult, TxValidationState, ValidationMode, ValidationState};
pub use transaction::{OutPoint, Transaction, TransactionRef, TxIn, TxOut};
pub use validator::{TxValidator, UtxoValidator, ValidatedTx, ValidationConfig};
pub use view::{Coin, CoinsView, MempoolView, PackageCoins, ValidationContext};

/// Network and policy parameters.
pub mod params {
    /// Base units per coin.
    pub const COIN: u64 = 100_000_000;

    /// Hundredth of a coin.
    pub const CENT: u64 = 1_000_000;

    /// Maximum amount of money that can exist.
    pub const MAX_MONEY: u64 = 21_000_000 * COIN;

    /// Weight multiplier for non-witness bytes.
    pub const WITNESS_SCALE_FACTOR: usize = 4;

    /// Largest standard transaction weight (100k vbytes).
    pub const MAX_STANDARD_TX_WEIGHT: usize = 400_000;

    /// Confirmations required before a coinbase output can be spent.
    pub const COINBASE_MATURITY: u32 = 100;

    /// Default minimum relay fee per 1000 vbytes.
    pub const DEFAULT_MIN_RELAY_FEE_PER_KVB: u64 = 1_000;

    /// Block subsidy used by test chains.
    pub const BLOCK_SUBSIDY: u64 = 50 * COIN;
}
