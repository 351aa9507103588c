//! Active chain view: the UTXO set at the current tip.
//!
//! Blocks are connected atomically: every input is resolved against the UTXO
//! set (or an earlier transaction of the same block) before anything is
//! written, so a failed connect leaves the state untouched.

use crate::{StateError, StateResult};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};
use txadmit_consensus::{BlockHash, Coin, CoinsView, OutPoint, TransactionRef, Txid};

/// Active chain tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTip {
    /// Block height (genesis is 0).
    pub height: u32,
    /// Block hash.
    pub hash: BlockHash,
}

/// Effect of connecting one block.
#[derive(Debug, Default, Clone)]
pub struct StateChange {
    /// Height of the connected block.
    pub height: u32,
    /// Transactions confirmed by the block.
    pub confirmed: Vec<Txid>,
    /// Coins removed from the UTXO set.
    pub spent: Vec<OutPoint>,
    /// Outputs created and spent within the block; never in the UTXO set.
    pub spent_in_block: Vec<OutPoint>,
    /// Coins added to the UTXO set.
    pub created: Vec<OutPoint>,
}

impl StateChange {
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    /// Every outpoint the block consumed, including its own outputs.
    pub fn all_spent(&self) -> Vec<OutPoint> {
        self.spent
            .iter()
            .chain(&self.spent_in_block)
            .copied()
            .collect()
    }
}

/// In-memory chainstate.
#[derive(Debug, Clone)]
pub struct Chainstate {
    coins: HashMap<OutPoint, Coin>,
    tip: ChainTip,
}

impl Chainstate {
    /// Empty chainstate at genesis.
    pub fn new() -> Self {
        Self {
            coins: HashMap::new(),
            tip: ChainTip {
                height: 0,
                hash: BlockHash::ZERO,
            },
        }
    }

    /// Current tip.
    pub fn tip(&self) -> ChainTip {
        self.tip
    }

    /// Unspent coin at `outpoint`.
    pub fn get_coin(&self, outpoint: &OutPoint) -> Option<&Coin> {
        self.coins.get(outpoint)
    }

    pub fn contains_coin(&self, outpoint: &OutPoint) -> bool {
        self.coins.contains_key(outpoint)
    }

    /// Number of unspent coins.
    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    /// Insert a coin directly, bypassing block connection.
    pub fn add_coin(&mut self, outpoint: OutPoint, coin: Coin) -> StateResult<()> {
        if self.coins.contains_key(&outpoint) {
            return Err(StateError::CoinExists(outpoint.to_string()));
        }
        self.coins.insert(outpoint, coin);
        Ok(())
    }

    /// Connect a block on top of the current tip.
    ///
    /// The first transaction must be the block's only coinbase.
    #[instrument(skip(self, txs), fields(height = self.tip.height + 1, txs = txs.len()))]
    pub fn connect_block(&mut self, txs: &[TransactionRef]) -> StateResult<StateChange> {
        let first = txs
            .first()
            .ok_or_else(|| StateError::InvalidBlock("Block has no transactions".to_string()))?;
        if !first.is_coinbase() {
            return Err(StateError::InvalidBlock(
                "First transaction is not a coinbase".to_string(),
            ));
        }
        if txs.iter().skip(1).any(|tx| tx.is_coinbase()) {
            return Err(StateError::InvalidBlock(
                "More than one coinbase".to_string(),
            ));
        }

        let height = self.tip.height + 1;
        let mut change = StateChange {
            height,
            ..Default::default()
        };
        let mut staged: HashMap<OutPoint, Coin> = HashMap::new();
        let mut seen: HashSet<OutPoint> = HashSet::new();

        for tx in txs {
            if !tx.is_coinbase() {
                for input in tx.inputs() {
                    let outpoint = input.previous_output;
                    if !seen.insert(outpoint) {
                        return Err(StateError::DoubleSpend(outpoint.to_string()));
                    }
                    if staged.remove(&outpoint).is_some() {
                        change.spent_in_block.push(outpoint);
                        continue;
                    }
                    if !self.coins.contains_key(&outpoint) {
                        return Err(StateError::MissingCoin(outpoint.to_string()));
                    }
                    change.spent.push(outpoint);
                }
            }

            for (outpoint, output) in tx.outpoints() {
                if self.coins.contains_key(&outpoint) || staged.contains_key(&outpoint) {
                    return Err(StateError::CoinExists(outpoint.to_string()));
                }
                staged.insert(outpoint, Coin::new(output.clone(), height, tx.is_coinbase()));
            }
            change.confirmed.push(tx.txid());
        }

        for outpoint in &change.spent {
            self.coins.remove(outpoint);
        }
        change.created = staged.keys().copied().collect();
        change.created.sort();
        self.coins.extend(staged);

        self.tip = ChainTip {
            height,
            hash: block_hash(&self.tip.hash, &change.confirmed),
        };

        debug!(
            spent = change.spent.len(),
            created = change.created.len(),
            "Block connected"
        );
        if height % 100 == 0 {
            info!(height, hash = %self.tip.hash, "Chain tip advanced");
        }
        Ok(change)
    }
}

impl Default for Chainstate {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinsView for Chainstate {
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.get(outpoint).cloned()
    }

    fn tip_height(&self) -> u32 {
        self.tip.height
    }
}

fn block_hash(prev: &BlockHash, txids: &[Txid]) -> BlockHash {
    let mut bytes = Vec::with_capacity(32 * (txids.len() + 1));
    bytes.extend_from_slice(prev.as_ref());
    for txid in txids {
        bytes.extend_from_slice(txid.as_ref());
    }
    BlockHash::hash(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use txadmit_consensus::params::BLOCK_SUBSIDY;
    use txadmit_consensus::{Transaction, TxIn, TxOut};

    fn coinbase(height: u32) -> TransactionRef {
        let mut input = TxIn::new(OutPoint::null());
        input.script_sig = height.to_le_bytes().to_vec();
        Transaction::new(2, vec![input], vec![TxOut::new(BLOCK_SUBSIDY, vec![0x51])], 0)
            .into_ref()
    }

    fn spend(outpoint: OutPoint, value: u64) -> TransactionRef {
        Transaction::new(2, vec![TxIn::new(outpoint)], vec![TxOut::new(value, vec![0x52])], 0)
            .into_ref()
    }

    #[test]
    fn test_connect_coinbase_block() {
        let mut state = Chainstate::new();
        let cb = coinbase(1);

        let change = state.connect_block(&[cb.clone()]).unwrap();

        assert_eq!(state.tip().height, 1);
        assert_ne!(state.tip().hash, BlockHash::ZERO);
        assert_eq!(change.created, vec![OutPoint::new(cb.txid(), 0)]);
        let coin = state.get_coin(&OutPoint::new(cb.txid(), 0)).unwrap();
        assert!(coin.is_coinbase);
        assert_eq!(coin.height, 1);
    }

    #[test]
    fn test_connect_spends_coins() {
        let mut state = Chainstate::new();
        let cb = coinbase(1);
        state.connect_block(&[cb.clone()]).unwrap();

        let tx = spend(OutPoint::new(cb.txid(), 0), BLOCK_SUBSIDY - 1000);
        let change = state.connect_block(&[coinbase(2), tx.clone()]).unwrap();

        assert_eq!(change.spent, vec![OutPoint::new(cb.txid(), 0)]);
        assert!(!state.contains_coin(&OutPoint::new(cb.txid(), 0)));
        assert!(state.contains_coin(&OutPoint::new(tx.txid(), 0)));
        assert_eq!(state.tip_height(), 2);
    }

    #[test]
    fn test_in_block_chain() {
        let mut state = Chainstate::new();
        let cb = coinbase(1);
        state.connect_block(&[cb.clone()]).unwrap();

        let parent = spend(OutPoint::new(cb.txid(), 0), 100);
        let child = spend(OutPoint::new(parent.txid(), 0), 90);
        let change = state
            .connect_block(&[coinbase(2), parent.clone(), child.clone()])
            .unwrap();

        assert_eq!(change.spent, vec![OutPoint::new(cb.txid(), 0)]);
        assert_eq!(change.spent_in_block, vec![OutPoint::new(parent.txid(), 0)]);
        assert_eq!(change.all_spent().len(), 2);
        assert!(!state.contains_coin(&OutPoint::new(parent.txid(), 0)));
        assert!(state.contains_coin(&OutPoint::new(child.txid(), 0)));
    }

    #[test]
    fn test_missing_coin_leaves_state_untouched() {
        let mut state = Chainstate::new();
        state.connect_block(&[coinbase(1)]).unwrap();
        let tip = state.tip();
        let coins = state.coin_count();

        let bogus = spend(OutPoint::new(Txid::from_bytes([7; 32]), 0), 1);
        let result = state.connect_block(&[coinbase(2), bogus]);

        assert!(matches!(result, Err(StateError::MissingCoin(_))));
        assert_eq!(state.tip(), tip);
        assert_eq!(state.coin_count(), coins);
    }

    #[test]
    fn test_double_spend_in_block() {
        let mut state = Chainstate::new();
        let cb = coinbase(1);
        state.connect_block(&[cb.clone()]).unwrap();

        let a = spend(OutPoint::new(cb.txid(), 0), 100);
        let b = spend(OutPoint::new(cb.txid(), 0), 200);
        let result = state.connect_block(&[coinbase(2), a, b]);
        assert!(matches!(result, Err(StateError::DoubleSpend(_))));
    }

    #[test]
    fn test_block_shape() {
        let mut state = Chainstate::new();
        assert!(matches!(
            state.connect_block(&[]),
            Err(StateError::InvalidBlock(_))
        ));
        let stray = spend(OutPoint::new(Txid::from_bytes([1; 32]), 0), 1);
        assert!(matches!(
            state.connect_block(&[stray]),
            Err(StateError::InvalidBlock(_))
        ));
        assert!(matches!(
            state.connect_block(&[coinbase(1), coinbase(2)]),
            Err(StateError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_add_coin_rejects_existing() {
        let mut state = Chainstate::new();
        let outpoint = OutPoint::new(Txid::from_bytes([3; 32]), 0);
        let coin = Coin::new(TxOut::new(5, vec![]), 0, false);

        state.add_coin(outpoint, coin.clone()).unwrap();
        assert!(matches!(
            state.add_coin(outpoint, coin),
            Err(StateError::CoinExists(_))
        ));
    }
}
