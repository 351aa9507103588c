//! Exclusive access to the chainstate and pool.
//!
//! Admission reads the chainstate and mutates the pool; both must stay
//! consistent for the whole call. `ChainLock::lock` hands out a guard that
//! is the only route to either, and the lock is released when it drops.

use crate::{Package, PackageLimits, PackageValidationResult};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;
use txadmit_consensus::{TransactionRef, TxValidator};
use txadmit_mempool::Mempool;
use txadmit_state::{Chainstate, StateChange, StateResult};

/// Owner of the chainstate and the pool it feeds.
///
/// The pool is owned here so no handle to it escapes the guard.
pub struct ChainLock {
    chainstate: Mutex<Chainstate>,
    mempool: Mempool,
}

impl ChainLock {
    pub fn new(chainstate: Chainstate, mempool: Mempool) -> Self {
        Self {
            chainstate: Mutex::new(chainstate),
            mempool,
        }
    }

    /// Block until exclusive access is available.
    pub fn lock(&self) -> ChainGuard<'_> {
        ChainGuard {
            chainstate: self.chainstate.lock(),
            mempool: &self.mempool,
        }
    }

    /// Non-blocking variant of [`ChainLock::lock`].
    pub fn try_lock(&self) -> Option<ChainGuard<'_>> {
        self.chainstate.try_lock().map(|chainstate| ChainGuard {
            chainstate,
            mempool: &self.mempool,
        })
    }

    /// Number of pooled transactions, readable without the lock.
    pub fn pool_size(&self) -> usize {
        self.mempool.len()
    }
}

/// Proof of exclusive access, passed by reference into admission.
pub struct ChainGuard<'a> {
    chainstate: MutexGuard<'a, Chainstate>,
    mempool: &'a Mempool,
}

impl<'a> ChainGuard<'a> {
    pub fn chainstate(&self) -> &Chainstate {
        &self.chainstate
    }

    pub fn chainstate_mut(&mut self) -> &mut Chainstate {
        &mut self.chainstate
    }

    pub fn mempool(&self) -> &Mempool {
        self.mempool
    }

    /// Validate a package and, unless `dry_run`, commit its valid members.
    pub fn process_new_package<V: TxValidator + ?Sized>(
        &self,
        engine: &V,
        package: &Package,
        dry_run: bool,
        limits: &PackageLimits,
    ) -> PackageValidationResult {
        crate::process_new_package(self, engine, package, dry_run, limits)
    }

    /// Connect a block and drop confirmed or conflicting pool transactions.
    pub fn connect_block(&mut self, txs: &[TransactionRef]) -> StateResult<StateChange> {
        let change = self.chainstate.connect_block(txs)?;
        let removed = self
            .mempool
            .remove_confirmed(&change.confirmed, &change.all_spent());
        debug!(height = change.height, removed, "Pool updated for new block");
        Ok(change)
    }
}
