//! # txadmit-state
//!
//! Chainstate for package admission.
//!
//! This crate provides:
//! - The UTXO set at the active tip (`Chainstate`)
//! - Atomic block connection producing a `StateChange`
//! - The `CoinsView` implementation validators resolve inputs against

mod chainstate;
mod error;

pub use chainstate::{ChainTip, Chainstate, StateChange};
pub use error::{StateError, StateResult};
