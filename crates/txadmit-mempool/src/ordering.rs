//! Transaction ordering by weight.

use std::cmp::Ordering;
use txadmit_consensus::Txid;

/// Pool entry key ordered by weight, highest first.
///
/// A transaction's weight starts at its own fee rate and grows by the weight
/// of every in-pool descendant, so parents always sort ahead of children.
#[derive(Debug, Clone)]
pub struct WeightedTxId {
    /// Transaction ID.
    pub txid: Txid,
    /// Current weight (own fee rate plus descendants).
    pub weight: i64,
    /// Own fee rate in base units per 1000 vbytes.
    pub fee_rate: i64,
    /// Virtual size.
    pub vsize: usize,
    /// Arrival time (unix millis).
    pub created: u64,
}

impl WeightedTxId {
    /// Create an entry whose weight equals its own fee rate.
    pub fn new(txid: Txid, fee: u64, vsize: usize, created: u64) -> Self {
        let fee_rate = fee_rate(fee, vsize);
        Self::with_weight(txid, fee_rate, fee_rate, vsize, created)
    }

    /// Create an entry with an explicit weight.
    pub fn with_weight(txid: Txid, weight: i64, fee_rate: i64, vsize: usize, created: u64) -> Self {
        Self {
            txid,
            weight,
            fee_rate,
            vsize,
            created,
        }
    }
}

/// Fee per 1000 vbytes, saturating.
pub fn fee_rate(fee: u64, vsize: usize) -> i64 {
    if vsize == 0 {
        return 0;
    }
    let rate = fee as u128 * 1000 / vsize as u128;
    rate.min(i64::MAX as u128) as i64
}

impl PartialEq for WeightedTxId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WeightedTxId {}

impl PartialOrd for WeightedTxId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WeightedTxId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher weight first, then earlier arrival, then txid for a total order
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| self.created.cmp(&other.created))
            .then_with(|| self.txid.cmp(&other.txid))
    }
}
