//! Test harness for integration tests.
//!
//! Provides a chain of 100 blocks on top of genesis whose coinbase outputs
//! are spendable at the next height, plus helpers for admitting packages.

use std::sync::Once;
use tracing_subscriber::EnvFilter;
use txadmit_consensus::params::BLOCK_SUBSIDY;
use txadmit_consensus::{OutPoint, Transaction, TransactionRef, TxIn, TxOut, UtxoValidator};
use txadmit_mempool::Mempool;
use txadmit_package::{AdmissionConfig, ChainGuard, ChainLock, Package, PackageValidationResult};
use txadmit_state::Chainstate;

/// Number of blocks mined by [`TestChain::new`].
pub const TEST_CHAIN_LENGTH: u32 = 100;

static TRACING: Once = Once::new();

/// Install a test log subscriber once per process, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Coinbase for `height` paying the full subsidy.
pub fn create_coinbase(height: u32) -> TransactionRef {
    let mut input = TxIn::new(OutPoint::null());
    input.script_sig = height.to_le_bytes().to_vec();
    Transaction::new(2, vec![input], vec![TxOut::new(BLOCK_SUBSIDY, vec![0x51])], 0).into_ref()
}

/// Chain, pool and validator wired together.
pub struct TestChain {
    lock: ChainLock,
    validator: UtxoValidator,
    config: AdmissionConfig,
    /// Coinbases in block order; index 0 was mined at height 1.
    pub coinbase_txns: Vec<TransactionRef>,
}

impl TestChain {
    /// Chain of [`TEST_CHAIN_LENGTH`] blocks with default configuration.
    pub fn new() -> Self {
        Self::with_config(AdmissionConfig::default())
    }

    pub fn with_config(config: AdmissionConfig) -> Self {
        init_tracing();

        let mut chainstate = Chainstate::new();
        let mut coinbase_txns = Vec::with_capacity(TEST_CHAIN_LENGTH as usize);
        for height in 1..=TEST_CHAIN_LENGTH {
            let coinbase = create_coinbase(height);
            chainstate
                .connect_block(&[coinbase.clone()])
                .expect("Failed to connect test block");
            coinbase_txns.push(coinbase);
        }

        let mempool = Mempool::new(config.mempool.clone());
        Self {
            lock: ChainLock::new(chainstate, mempool),
            validator: UtxoValidator::new(config.validation.clone()),
            config,
            coinbase_txns,
        }
    }

    /// Acquire the chain lock.
    pub fn guard(&self) -> ChainGuard<'_> {
        self.lock.lock()
    }

    pub fn validator(&self) -> &UtxoValidator {
        &self.validator
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Pool size observed without the lock.
    pub fn pool_size(&self) -> usize {
        self.lock.pool_size()
    }

    /// Outpoint of the coinbase mined at height `index + 1`.
    pub fn coinbase_outpoint(&self, index: usize) -> OutPoint {
        OutPoint::new(self.coinbase_txns[index].txid(), 0)
    }

    /// Take the lock and admit `package` with the configured limits.
    pub fn process(&self, package: Vec<TransactionRef>, dry_run: bool) -> PackageValidationResult {
        let guard = self.guard();
        guard.process_new_package(
            &self.validator,
            &Package::new(package),
            dry_run,
            &self.config.package,
        )
    }

    /// Mine a block holding `txs` after a fresh coinbase.
    pub fn mine(&self, txs: &[TransactionRef]) {
        let mut guard = self.guard();
        let height = guard.chainstate().tip().height + 1;
        let mut block = vec![create_coinbase(height)];
        block.extend_from_slice(txs);
        guard.connect_block(&block).expect("Failed to connect block");
    }
}

impl Default for TestChain {
    fn default() -> Self {
        Self::new()
    }
}
