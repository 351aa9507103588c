//! Read-only views a validator resolves inputs against.
//!
//! Inputs are looked up in three layers, nearest first: outputs created by
//! earlier members of the package being admitted, outputs of transactions
//! already in the pending pool, and finally the confirmed UTXO set.

use crate::{OutPoint, Transaction, TxOut, Txid};
use std::collections::{HashMap, HashSet};

/// An unspent output in the confirmed UTXO set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    /// The output itself.
    pub output: TxOut,
    /// Height of the block that created it.
    pub height: u32,
    /// Whether it was created by a coinbase transaction.
    pub is_coinbase: bool,
}

impl Coin {
    pub fn new(output: TxOut, height: u32, is_coinbase: bool) -> Self {
        Self {
            output,
            height,
            is_coinbase,
        }
    }
}

/// Confirmed chain view: UTXO lookups plus the active tip height.
pub trait CoinsView {
    /// Unspent coin at `outpoint`, if any.
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin>;

    /// Height of the active chain tip.
    fn tip_height(&self) -> u32;
}

/// Pending-pool view used during validation.
pub trait MempoolView {
    /// Whether a transaction with this id is in the pool.
    fn contains_tx(&self, txid: &Txid) -> bool;

    /// Output created by a pool transaction.
    fn output(&self, outpoint: &OutPoint) -> Option<TxOut>;

    /// Pool transaction spending `outpoint`, if any.
    fn spender(&self, outpoint: &OutPoint) -> Option<Txid>;

    /// Number of transactions in the pool.
    fn size(&self) -> usize;
}

/// Outputs created, and outpoints spent, by package members validated so far.
#[derive(Debug, Default, Clone)]
pub struct PackageCoins {
    created: HashMap<OutPoint, TxOut>,
    spent: HashSet<OutPoint>,
}

impl PackageCoins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a validated member: its outputs become spendable by later
    /// members and its inputs are marked spent.
    pub fn add_transaction(&mut self, tx: &Transaction) {
        for input in tx.inputs() {
            self.spent.insert(input.previous_output);
        }
        for (outpoint, output) in tx.outpoints() {
            self.created.insert(outpoint, output.clone());
        }
    }

    /// Output created by an earlier member.
    pub fn output(&self, outpoint: &OutPoint) -> Option<&TxOut> {
        self.created.get(outpoint)
    }

    /// Whether an earlier member already spends `outpoint`.
    pub fn is_spent(&self, outpoint: &OutPoint) -> bool {
        self.spent.contains(outpoint)
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.spent.is_empty()
    }
}

/// Everything a validator may read while checking one transaction.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Confirmed chain state at the active tip.
    pub coins: &'a dyn CoinsView,
    /// Pending pool.
    pub mempool: &'a dyn MempoolView,
    /// Earlier members of the package being admitted.
    pub package: &'a PackageCoins,
}

impl<'a> ValidationContext<'a> {
    /// Context for a transaction submitted outside any package.
    pub fn new(
        coins: &'a dyn CoinsView,
        mempool: &'a dyn MempoolView,
        package: &'a PackageCoins,
    ) -> Self {
        Self {
            coins,
            mempool,
            package,
        }
    }

    /// Height a transaction accepted now would be mined at.
    pub fn spend_height(&self) -> u32 {
        self.coins.tip_height().saturating_add(1)
    }
}
