//! # txadmit-mempool
//!
//! Pending-transaction pool.
//!
//! This crate provides:
//! - Transaction storage with weight-based ordering
//! - Double-spend detection against pool transactions
//! - Size limits and eviction policies
//! - Transaction dependency tracking

mod error;
mod ordering;
mod pool;

pub use error::{MempoolError, MempoolResult};
pub use ordering::{fee_rate, WeightedTxId};
pub use pool::{Mempool, MempoolConfig, PooledTransaction};

/// Default maximum total virtual size.
pub const DEFAULT_MAX_SIZE: usize = 100 * 1_000_000; // 100 MvB

/// Default maximum number of transactions.
pub const DEFAULT_MAX_TXS: usize = 10_000;

/// Default minimum fee per 1000 vbytes.
pub const DEFAULT_MIN_FEE_PER_KVB: u64 = 1_000;
