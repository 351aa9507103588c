//! Pending-transaction pool with dependency tracking.
//!
//! Key features:
//!
//! - Transactions are ordered by weight (not just fee rate)
//! - When a transaction spends outputs of another pool transaction, the
//!   parent's weight is increased by the child's weight
//! - This keeps parents ahead of children in block-template order
//! - Double-spend detection prevents conflicting transactions
//! - Eviction removes the lowest-weight transaction together with its
//!   in-pool descendants

use crate::ordering::WeightedTxId;
use crate::{MempoolError, MempoolResult};
use crate::{DEFAULT_MAX_SIZE, DEFAULT_MAX_TXS, DEFAULT_MIN_FEE_PER_KVB};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, instrument, warn};
use txadmit_consensus::{MempoolView, OutPoint, TransactionRef, TxOut, Txid, Wtxid};

/// Mempool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum total virtual size.
    pub max_size: usize,
    /// Maximum number of transactions.
    pub max_transactions: usize,
    /// Minimum fee per 1000 vbytes.
    pub min_fee_per_kvb: u64,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_transactions: DEFAULT_MAX_TXS,
            min_fee_per_kvb: DEFAULT_MIN_FEE_PER_KVB,
        }
    }
}

/// Stored transaction in the mempool.
#[derive(Debug, Clone)]
pub struct PooledTransaction {
    /// The transaction.
    pub tx: TransactionRef,
    /// Fee paid.
    pub fee: u64,
    /// Virtual size.
    pub vsize: usize,
    /// Arrival timestamp (unix millis).
    pub arrival_time: u64,
}

impl PooledTransaction {
    /// Wrap a validated transaction, stamping the current time.
    pub fn new(tx: TransactionRef, fee: u64) -> Self {
        let vsize = tx.vsize();
        Self {
            tx,
            fee,
            vsize,
            arrival_time: now_millis(),
        }
    }

    pub fn txid(&self) -> Txid {
        self.tx.txid()
    }

    pub fn wtxid(&self) -> Wtxid {
        self.tx.wtxid()
    }

    /// Fee per 1000 vbytes.
    pub fn fee_rate(&self) -> i64 {
        crate::ordering::fee_rate(self.fee, self.vsize)
    }
}

/// Maximum depth for ancestor weight updates.
/// Bounds the work done for deeply nested transaction chains.
const MAX_ANCESTOR_SCAN_DEPTH: usize = 500;

/// Pending-transaction pool.
///
/// All maps are internally synchronized so readers (size counters, RPC)
/// can query the pool without the admission lock; admission itself
/// serializes writers.
pub struct Mempool {
    /// Configuration.
    config: MempoolConfig,

    /// Transactions by ID.
    transactions: DashMap<Txid, PooledTransaction>,

    /// Weight info by ID.
    registry: DashMap<Txid, WeightedTxId>,

    /// Weight-ordered transaction set.
    /// Higher weight = higher priority (comes first in iteration).
    weight_order: RwLock<BTreeSet<WeightedTxId>>,

    /// Outpoint -> pool transaction that spends it.
    spenders: DashMap<OutPoint, Txid>,

    /// Current total virtual size.
    total_size: RwLock<usize>,
}

impl Mempool {
    /// Create a new mempool with the given configuration.
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: DashMap::new(),
            registry: DashMap::new(),
            weight_order: RwLock::new(BTreeSet::new()),
            spenders: DashMap::new(),
            total_size: RwLock::new(0),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MempoolConfig::default())
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    /// Add a transaction to the mempool.
    ///
    /// This will:
    /// 1. Check for duplicates, size, fee rate and double spends
    /// 2. Add the transaction with initial weight = own fee rate
    /// 3. Add its weight to in-pool ancestors
    /// 4. Evict lowest weight transactions if the pool is over capacity
    ///
    /// Fails with `Full` if the new transaction was itself evicted.
    #[instrument(skip(self, entry), fields(txid = %entry.txid()))]
    pub fn add(&self, entry: PooledTransaction) -> MempoolResult<()> {
        let txid = entry.txid();

        if self.transactions.contains_key(&txid) {
            return Err(MempoolError::AlreadyExists(txid));
        }

        let max_tx_size = self.config.max_size / 10;
        if entry.vsize > max_tx_size {
            return Err(MempoolError::TooLarge {
                size: entry.vsize,
                max: max_tx_size,
            });
        }

        let min_fee = (self.config.min_fee_per_kvb as u128 * entry.vsize as u128 / 1000) as u64;
        if entry.fee < min_fee {
            return Err(MempoolError::FeeTooLow {
                fee: entry.fee,
                min: min_fee,
            });
        }

        for input in entry.tx.inputs() {
            if self.spenders.contains_key(&input.previous_output) {
                return Err(MempoolError::DoubleSpend(input.previous_output));
            }
        }

        let wtx = WeightedTxId::new(txid, entry.fee, entry.vsize, entry.arrival_time);

        self.registry.insert(txid, wtx.clone());
        for input in entry.tx.inputs() {
            self.spenders.insert(input.previous_output, txid);
        }
        self.weight_order.write().insert(wtx.clone());
        *self.total_size.write() += entry.vsize;
        self.transactions.insert(txid, entry.clone());

        // Parents get weight from this child
        self.update_family(&entry, wtx.weight);

        let evicted = self.maybe_evict();
        if evicted.contains(&txid) {
            return Err(MempoolError::Full {
                count: self.transactions.len(),
                max: self.config.max_transactions,
            });
        }

        debug!(
            count = self.transactions.len(),
            "Transaction added to mempool"
        );
        Ok(())
    }

    /// Add `weight_delta` to every in-pool ancestor of `entry`.
    fn update_family(&self, entry: &PooledTransaction, weight_delta: i64) {
        self.update_family_recursive(entry, weight_delta, 0);
    }

    fn update_family_recursive(&self, entry: &PooledTransaction, weight_delta: i64, depth: usize) {
        if depth > MAX_ANCESTOR_SCAN_DEPTH {
            warn!(txid = %entry.txid(), depth, "Ancestor update exceeded max depth");
            return;
        }

        let parent_ids: HashSet<Txid> = entry
            .tx
            .inputs()
            .iter()
            .map(|input| input.previous_output.txid)
            .filter(|parent| *parent != entry.txid())
            .collect();

        for parent_id in parent_ids {
            let old_wtx = match self.registry.get(&parent_id) {
                Some(wtx) => wtx.clone(),
                None => continue,
            };
            let parent = match self.transactions.get(&parent_id) {
                Some(tx) => tx.clone(),
                None => continue,
            };

            let new_wtx = WeightedTxId::with_weight(
                old_wtx.txid,
                old_wtx.weight + weight_delta,
                old_wtx.fee_rate,
                old_wtx.vsize,
                old_wtx.created,
            );

            self.registry.insert(parent_id, new_wtx.clone());
            {
                let mut order = self.weight_order.write();
                order.remove(&old_wtx);
                order.insert(new_wtx);
            }

            self.update_family_recursive(&parent, weight_delta, depth + 1);
        }
    }

    /// Evict lowest weight transactions while over capacity.
    fn maybe_evict(&self) -> Vec<Txid> {
        let mut evicted = Vec::new();

        while self.transactions.len() > self.config.max_transactions
            || *self.total_size.read() > self.config.max_size
        {
            let lowest = {
                let order = self.weight_order.read();
                order.iter().last().map(|wtx| wtx.txid)
            };
            let Some(txid) = lowest else { break };

            let removed = self.remove_with_descendants(&txid);
            if removed.is_empty() {
                break;
            }
            warn!(%txid, removed = removed.len(), "Evicted lowest weight transaction");
            evicted.extend(removed.into_iter().map(|entry| entry.txid()));
        }

        evicted
    }

    /// Remove a transaction by ID.
    ///
    /// In-pool children are left in place.
    #[instrument(skip(self), fields(txid = %txid))]
    pub fn remove(&self, txid: &Txid) -> MempoolResult<PooledTransaction> {
        let (_, entry) = self
            .transactions
            .remove(txid)
            .ok_or(MempoolError::NotFound(*txid))?;

        let wtx = self.registry.remove(txid).map(|(_, w)| w);
        if let Some(ref wtx) = wtx {
            self.weight_order.write().remove(wtx);
        }

        for input in entry.tx.inputs() {
            self.spenders
                .remove_if(&input.previous_output, |_, spender| spender == txid);
        }

        *self.total_size.write() -= entry.vsize;

        // Subtract this transaction's weight from its ancestors
        if let Some(wtx) = wtx {
            self.update_family(&entry, -wtx.weight);
        }

        debug!(
            count = self.transactions.len(),
            "Transaction removed from mempool"
        );
        Ok(entry)
    }

    /// Remove a transaction and every in-pool descendant, children first.
    pub fn remove_with_descendants(&self, txid: &Txid) -> Vec<PooledTransaction> {
        let mut removed = Vec::new();
        self.remove_recursive(txid, &mut removed, 0);
        removed
    }

    fn remove_recursive(&self, txid: &Txid, removed: &mut Vec<PooledTransaction>, depth: usize) {
        if depth > MAX_ANCESTOR_SCAN_DEPTH {
            return;
        }
        let outputs = match self.transactions.get(txid) {
            Some(entry) => entry.tx.outputs().len(),
            None => return,
        };
        for vout in 0..outputs {
            let child = self
                .spenders
                .get(&OutPoint::new(*txid, vout as u32))
                .map(|r| *r);
            if let Some(child) = child {
                self.remove_recursive(&child, removed, depth + 1);
            }
        }
        if let Ok(entry) = self.remove(txid) {
            removed.push(entry);
        }
    }

    /// Get a transaction by ID.
    pub fn get(&self, txid: &Txid) -> Option<PooledTransaction> {
        self.transactions.get(txid).map(|r| r.clone())
    }

    /// Check if a transaction exists.
    pub fn contains(&self, txid: &Txid) -> bool {
        self.transactions.contains_key(txid)
    }

    /// Check if an outpoint is already spent by a pool transaction.
    pub fn is_outpoint_spent(&self, outpoint: &OutPoint) -> bool {
        self.spenders.contains_key(outpoint)
    }

    /// Get the pool transaction that spends a given outpoint.
    pub fn spending_tx(&self, outpoint: &OutPoint) -> Option<Txid> {
        self.spenders.get(outpoint).map(|r| *r)
    }

    /// Output created by a pool transaction.
    pub fn get_output(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.transactions
            .get(&outpoint.txid)
            .and_then(|entry| entry.tx.outputs().get(outpoint.vout as usize).cloned())
    }

    /// Get transactions ordered by weight (highest first).
    ///
    /// Parents always have higher weight than their in-pool children.
    pub fn get_by_weight(&self, limit: usize) -> Vec<PooledTransaction> {
        let order = self.weight_order.read();
        order
            .iter()
            .take(limit)
            .filter_map(|wtx| self.get(&wtx.txid))
            .collect()
    }

    /// Get all transaction IDs.
    pub fn get_all_ids(&self) -> Vec<Txid> {
        self.transactions.iter().map(|r| *r.key()).collect()
    }

    /// Get the weight of a transaction.
    pub fn get_weight(&self, txid: &Txid) -> Option<i64> {
        self.registry.get(txid).map(|r| r.weight)
    }

    /// Total virtual size of pooled transactions.
    pub fn total_size(&self) -> usize {
        *self.total_size.read()
    }

    /// Clear all transactions.
    pub fn clear(&self) {
        self.transactions.clear();
        self.registry.clear();
        self.spenders.clear();
        self.weight_order.write().clear();
        *self.total_size.write() = 0;
        info!("Mempool cleared");
    }

    /// Drop transactions confirmed by a block and any that now conflict with it.
    ///
    /// `spent` lists the outpoints the block consumed; pool transactions
    /// spending them are removed together with their descendants.
    pub fn remove_confirmed(&self, confirmed: &[Txid], spent: &[OutPoint]) -> usize {
        let mut count = 0;

        for txid in confirmed {
            if self.remove(txid).is_ok() {
                count += 1;
            }
        }

        let conflicts: Vec<Txid> = spent
            .iter()
            .filter_map(|outpoint| self.spending_tx(outpoint))
            .collect();
        for txid in conflicts {
            count += self.remove_with_descendants(&txid).len();
        }

        if count > 0 {
            debug!(count, "Removed confirmed and conflicting transactions");
        }
        count
    }

    /// Get the number of transactions in the pool.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MempoolView for Mempool {
    fn contains_tx(&self, txid: &Txid) -> bool {
        self.contains(txid)
    }

    fn output(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.get_output(outpoint)
    }

    fn spender(&self, outpoint: &OutPoint) -> Option<Txid> {
        self.spending_tx(outpoint)
    }

    fn size(&self) -> usize {
        self.len()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
