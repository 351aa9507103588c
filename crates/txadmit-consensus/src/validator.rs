//! Transaction validation against the chain, pool and package views.
//!
//! `UtxoValidator` is the reference engine. It covers:
//! - Structural checks (inputs/outputs present, value ranges, duplicate inputs)
//! - Standardness (transaction weight)
//! - Conflicts with the pool and with earlier package members
//! - Input resolution and coinbase maturity
//! - Value conservation and the minimum relay fee
//!
//! Script execution is not performed.

use crate::params::{
    COINBASE_MATURITY, DEFAULT_MIN_RELAY_FEE_PER_KVB, MAX_MONEY, MAX_STANDARD_TX_WEIGHT,
};
use crate::{Transaction, TxValidationResult, TxValidationState, ValidationContext};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// A transaction that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedTx {
    /// Fee paid (inputs minus outputs).
    pub fee: u64,
    /// Virtual size.
    pub vsize: usize,
}

/// Validation engine seam.
///
/// Implementations must resolve inputs through all three layers of the
/// context so that a package member may spend outputs of earlier members.
pub trait TxValidator {
    /// Validate `tx`, returning its fee and size or the rejecting state.
    fn validate(
        &self,
        ctx: &ValidationContext<'_>,
        tx: &Transaction,
    ) -> Result<ValidatedTx, TxValidationState>;
}

/// Reference validator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Largest standard transaction weight.
    pub max_standard_tx_weight: usize,
    /// Minimum relay fee in base units per 1000 vbytes.
    pub min_relay_fee_per_kvb: u64,
    /// Confirmations before a coinbase output may be spent.
    pub coinbase_maturity: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_standard_tx_weight: MAX_STANDARD_TX_WEIGHT,
            min_relay_fee_per_kvb: DEFAULT_MIN_RELAY_FEE_PER_KVB,
            coinbase_maturity: COINBASE_MATURITY,
        }
    }
}

impl ValidationConfig {
    /// Minimum fee for a transaction of `vsize` vbytes.
    pub fn min_relay_fee(&self, vsize: usize) -> u64 {
        (self.min_relay_fee_per_kvb as u128 * vsize as u128 / 1000) as u64
    }
}

/// Reference UTXO validation engine.
#[derive(Debug, Clone, Default)]
pub struct UtxoValidator {
    config: ValidationConfig,
}

impl UtxoValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Context-free checks.
    fn check_structure(&self, tx: &Transaction) -> Result<(), TxValidationState> {
        if tx.inputs().is_empty() {
            return Err(consensus("bad-txns-vin-empty"));
        }
        if tx.outputs().is_empty() {
            return Err(consensus("bad-txns-vout-empty"));
        }

        let mut total = 0u64;
        for output in tx.outputs() {
            if output.value > MAX_MONEY {
                return Err(consensus("bad-txns-vout-toolarge"));
            }
            total = match total.checked_add(output.value) {
                Some(t) if t <= MAX_MONEY => t,
                _ => return Err(consensus("bad-txns-txouttotal-toolarge")),
            };
        }

        let mut seen = HashSet::with_capacity(tx.inputs().len());
        for input in tx.inputs() {
            if !seen.insert(input.previous_output) {
                return Err(consensus("bad-txns-inputs-duplicate"));
            }
        }

        if tx.is_coinbase() {
            return Err(consensus("coinbase"));
        }

        if tx.weight() > self.config.max_standard_tx_weight {
            return Err(TxValidationState::invalid_with_debug(
                TxValidationResult::NotStandard,
                "tx-size",
                format!(
                    "weight {} exceeds {}",
                    tx.weight(),
                    self.config.max_standard_tx_weight
                ),
            ));
        }

        Ok(())
    }

    /// Resolve every input through package, pool and chain, returning the
    /// total input value.
    fn check_inputs(
        &self,
        ctx: &ValidationContext<'_>,
        tx: &Transaction,
    ) -> Result<u64, TxValidationState> {
        if ctx.mempool.contains_tx(&tx.txid()) {
            return Err(TxValidationState::invalid(
                TxValidationResult::Conflict,
                "txn-already-in-mempool",
            ));
        }

        let spend_height = ctx.spend_height();
        let mut value_in = 0u64;

        for input in tx.inputs() {
            let outpoint = &input.previous_output;

            if ctx.package.is_spent(outpoint) {
                return Err(TxValidationState::invalid_with_debug(
                    TxValidationResult::Conflict,
                    "txn-mempool-conflict",
                    format!("{} already spent by an earlier package member", outpoint),
                ));
            }
            if let Some(spender) = ctx.mempool.spender(outpoint) {
                return Err(TxValidationState::invalid_with_debug(
                    TxValidationResult::Conflict,
                    "txn-mempool-conflict",
                    format!("{} already spent by {}", outpoint, spender),
                ));
            }

            let value = if let Some(output) = ctx.package.output(outpoint) {
                output.value
            } else if let Some(output) = ctx.mempool.output(outpoint) {
                output.value
            } else if let Some(coin) = ctx.coins.coin(outpoint) {
                if coin.is_coinbase
                    && spend_height.saturating_sub(coin.height) < self.config.coinbase_maturity
                {
                    return Err(TxValidationState::invalid_with_debug(
                        TxValidationResult::PrematureSpend,
                        "bad-txns-premature-spend-of-coinbase",
                        format!(
                            "tried to spend coinbase at depth {}",
                            spend_height.saturating_sub(coin.height)
                        ),
                    ));
                }
                coin.output.value
            } else {
                return Err(TxValidationState::invalid_with_debug(
                    TxValidationResult::MissingInputs,
                    "bad-txns-inputs-missingorspent",
                    format!("{} not found", outpoint),
                ));
            };

            value_in = match value_in.checked_add(value) {
                Some(v) if v <= MAX_MONEY => v,
                _ => return Err(consensus("bad-txns-inputvalues-outofrange")),
            };
        }

        Ok(value_in)
    }
}

impl TxValidator for UtxoValidator {
    #[instrument(skip(self, ctx, tx), fields(txid = %tx.txid()))]
    fn validate(
        &self,
        ctx: &ValidationContext<'_>,
        tx: &Transaction,
    ) -> Result<ValidatedTx, TxValidationState> {
        self.check_structure(tx)?;
        let value_in = self.check_inputs(ctx, tx)?;

        // Range was checked in check_structure
        let value_out = tx.value_out().unwrap_or(u64::MAX);
        if value_in < value_out {
            return Err(TxValidationState::invalid_with_debug(
                TxValidationResult::Consensus,
                "bad-txns-in-belowout",
                format!("value in ({}) < value out ({})", value_in, value_out),
            ));
        }

        let fee = value_in - value_out;
        let vsize = tx.vsize();
        let min_fee = self.config.min_relay_fee(vsize);
        if fee < min_fee {
            return Err(TxValidationState::invalid_with_debug(
                TxValidationResult::MempoolPolicy,
                "min relay fee not met",
                format!("{} < {}", fee, min_fee),
            ));
        }

        debug!(fee, vsize, "Transaction validated");
        Ok(ValidatedTx { fee, vsize })
    }
}

fn consensus(reason: &str) -> TxValidationState {
    TxValidationState::invalid(TxValidationResult::Consensus, reason)
}
