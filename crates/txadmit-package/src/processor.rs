//! Package validation and commit.
//!
//! Members are validated one at a time in package order against the locked
//! chainstate, the pool and an overlay of outputs created by earlier members
//! that validated. Each valid member is committed on its own when not a dry
//! run, so a failing member never rolls back its siblings; a package rejected
//! by [`check_package`] commits nothing.

use crate::result::TX_FAILED_REASON;
use crate::{
    check_package, ChainGuard, Package, PackageLimits, PackageValidationKind,
    PackageValidationResult, PackageValidationState, TxAcceptResult,
};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use txadmit_consensus::{
    PackageCoins, TransactionRef, TxValidationResult, TxValidationState, TxValidator, Txid,
    ValidationContext, Wtxid,
};
use txadmit_mempool::PooledTransaction;

/// Reject reason for a committed member later evicted by the pool.
const EVICTED_REASON: &str = "mempool full";

/// Validate `package` under `guard` and, unless `dry_run`, commit every
/// member that validates.
#[instrument(skip(guard, engine, package, limits), fields(txs = package.len()))]
pub fn process_new_package<V: TxValidator + ?Sized>(
    guard: &ChainGuard<'_>,
    engine: &V,
    package: &Package,
    dry_run: bool,
    limits: &PackageLimits,
) -> PackageValidationResult {
    let state = check_package(package, limits);
    if !state.is_valid() {
        debug!(reason = state.reject_reason(), "Package rejected by policy");
        return PackageValidationResult::policy_failure(state);
    }

    let mut overlay = PackageCoins::new();
    let mut results = BTreeMap::new();
    let mut committed = Vec::new();

    for tx in package {
        let result = accept_member(guard, engine, &mut overlay, tx, dry_run, limits);
        if !result.is_valid() {
            debug!(
                txid = %tx.txid(),
                reason = result.state.reject_reason(),
                "Package member rejected"
            );
        } else if !dry_run {
            committed.push((tx.txid(), tx.wtxid()));
        }
        results.insert(tx.wtxid(), result);

        // Commit can evict earlier members from a full pool
        if !dry_run && mark_evicted(guard, &mut committed, &mut results) {
            overlay = PackageCoins::new();
            for member in package {
                if results.get(&member.wtxid()).is_some_and(TxAcceptResult::is_valid) {
                    overlay.add_transaction(member);
                }
            }
        }
    }

    let failed = results.values().filter(|result| !result.is_valid()).count();
    let state = if failed == 0 {
        PackageValidationState::valid()
    } else {
        PackageValidationState::invalid(PackageValidationKind::Tx, TX_FAILED_REASON)
    };

    info!(
        accepted = package.len() - failed,
        failed,
        pool_size = guard.mempool().len(),
        pool_vsize = guard.mempool().total_size(),
        "Package processed"
    );
    PackageValidationResult::new(state, results)
}

/// Replace the result of every committed member no longer in the pool.
/// Returns whether any member was marked.
fn mark_evicted(
    guard: &ChainGuard<'_>,
    committed: &mut Vec<(Txid, Wtxid)>,
    results: &mut BTreeMap<Wtxid, TxAcceptResult>,
) -> bool {
    let before = committed.len();
    committed.retain(|(txid, wtxid)| {
        if guard.mempool().contains(txid) {
            return true;
        }
        warn!(%txid, "Committed package member evicted from pool");
        results.insert(
            *wtxid,
            TxAcceptResult::rejected(TxValidationState::invalid_with_debug(
                TxValidationResult::MempoolPolicy,
                EVICTED_REASON,
                "evicted while admitting a later member",
            )),
        );
        false
    });
    committed.len() != before
}

fn accept_member<V: TxValidator + ?Sized>(
    guard: &ChainGuard<'_>,
    engine: &V,
    overlay: &mut PackageCoins,
    tx: &TransactionRef,
    dry_run: bool,
    limits: &PackageLimits,
) -> TxAcceptResult {
    let vsize = tx.vsize();
    let max_size = limits.max_size_vbytes();
    if vsize > max_size {
        return TxAcceptResult::rejected(TxValidationState::invalid_with_debug(
            TxValidationResult::NotStandard,
            "tx-size",
            format!("{} vbytes exceeds package limit {}", vsize, max_size),
        ));
    }

    let validated = {
        let ctx = ValidationContext::new(guard.chainstate(), guard.mempool(), overlay);
        match engine.validate(&ctx, tx) {
            Ok(validated) => validated,
            Err(state) => return TxAcceptResult::rejected(state),
        }
    };

    if !dry_run {
        if let Err(e) = commit(guard, tx, validated.fee) {
            return TxAcceptResult::rejected(e);
        }
    }

    overlay.add_transaction(tx);
    TxAcceptResult::accepted(validated.vsize, validated.fee)
}

fn commit(guard: &ChainGuard<'_>, tx: &TransactionRef, fee: u64) -> Result<(), TxValidationState> {
    guard
        .mempool()
        .add(PooledTransaction::new(tx.clone(), fee))
        .map_err(|e| {
            warn!(txid = %tx.txid(), error = %e, "Pool refused validated transaction");
            TxValidationState::invalid_with_debug(
                TxValidationResult::MempoolPolicy,
                e.reject_reason(),
                e.to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainLock;
    use txadmit_consensus::{Coin, OutPoint, Transaction, TxIn, TxOut, UtxoValidator, ValidatedTx};
    use txadmit_mempool::{Mempool, MempoolConfig};
    use txadmit_state::Chainstate;

    const FUNDING_VALUE: u64 = 100_000;

    fn funding(n: u8) -> OutPoint {
        OutPoint::new(Txid::from_bytes([n; 32]), 0)
    }

    fn setup() -> ChainLock {
        let mut chainstate = Chainstate::new();
        for n in 1..=4 {
            chainstate
                .add_coin(
                    funding(n),
                    Coin::new(TxOut::new(FUNDING_VALUE, vec![0x51]), 0, false),
                )
                .unwrap();
        }
        ChainLock::new(chainstate, Mempool::with_defaults())
    }

    fn spend(outpoint: OutPoint, value: u64) -> TransactionRef {
        Transaction::new(2, vec![TxIn::new(outpoint)], vec![TxOut::new(value, vec![0x51])], 0)
            .into_ref()
    }

    fn chain() -> (TransactionRef, TransactionRef) {
        let parent = spend(funding(1), FUNDING_VALUE - 1_000);
        let child = spend(OutPoint::new(parent.txid(), 0), FUNDING_VALUE - 2_000);
        (parent, child)
    }

    #[test]
    fn test_dry_run_accepts_chain_without_commit() {
        let lock = setup();
        let guard = lock.lock();
        let (parent, child) = chain();
        let package = Package::new(vec![parent.clone(), child.clone()]);

        let result = guard.process_new_package(
            &UtxoValidator::default(),
            &package,
            true,
            &PackageLimits::default(),
        );

        assert!(result.is_valid(), "{}", result.state());
        assert_eq!(result.tx_results().len(), 2);
        assert_eq!(result.tx_result(&child.wtxid()).and_then(|r| r.fee), Some(1_000));
        assert_eq!(
            result.tx_result(&parent.wtxid()).and_then(|r| r.vsize),
            Some(parent.vsize())
        );
        assert!(guard.mempool().is_empty());
    }

    #[test]
    fn test_submit_commits_chain() {
        let lock = setup();
        let guard = lock.lock();
        let (parent, child) = chain();

        let result = process_new_package(
            &guard,
            &UtxoValidator::default(),
            &Package::new(vec![parent.clone(), child.clone()]),
            false,
            &PackageLimits::default(),
        );

        assert!(result.is_valid());
        assert_eq!(guard.mempool().len(), 2);
        assert!(guard.mempool().contains(&parent.txid()));
        assert!(guard.mempool().contains(&child.txid()));
    }

    #[test]
    fn test_failed_parent_fails_child() {
        let lock = setup();
        let guard = lock.lock();
        // Spends more than the funding coin holds
        let parent = spend(funding(1), FUNDING_VALUE + 1);
        let child = spend(OutPoint::new(parent.txid(), 0), 10);
        let independent = spend(funding(2), FUNDING_VALUE - 1_000);

        let result = guard.process_new_package(
            &UtxoValidator::default(),
            &Package::new(vec![parent.clone(), child.clone(), independent.clone()]),
            false,
            &PackageLimits::default(),
        );

        assert!(result.is_item_failure());
        assert_eq!(result.state().reject_reason(), "transaction failed");
        let parent_state = &result.tx_result(&parent.wtxid()).unwrap().state;
        assert_eq!(parent_state.reject_reason(), "bad-txns-in-belowout");
        let child_state = &result.tx_result(&child.wtxid()).unwrap().state;
        assert_eq!(child_state.result(), Some(TxValidationResult::MissingInputs));
        assert!(result.tx_result(&independent.wtxid()).unwrap().is_valid());

        assert_eq!(guard.mempool().len(), 1);
        assert!(guard.mempool().contains(&independent.txid()));
        assert_eq!(result.failed_members().count(), 2);
    }

    #[test]
    fn test_policy_failure_commits_nothing() {
        let lock = setup();
        let guard = lock.lock();
        let (parent, child) = chain();

        let result = guard.process_new_package(
            &UtxoValidator::default(),
            &Package::new(vec![child, parent]),
            false,
            &PackageLimits::default(),
        );

        assert!(result.is_policy_failure());
        assert_eq!(result.state().reject_reason(), "package-not-sorted");
        assert!(result.tx_results().is_empty());
        assert!(guard.mempool().is_empty());
    }

    #[test]
    fn test_oversized_member_skips_engine() {
        struct Unreachable;
        impl TxValidator for Unreachable {
            fn validate(
                &self,
                _ctx: &ValidationContext<'_>,
                _tx: &Transaction,
            ) -> Result<ValidatedTx, TxValidationState> {
                panic!("engine must not be called for an oversized member");
            }
        }

        let lock = setup();
        let guard = lock.lock();
        let tx = spend(funding(1), 1_000);
        let limits = PackageLimits {
            max_size_kvb: 0,
            ..Default::default()
        };

        let result =
            guard.process_new_package(&Unreachable, &Package::new(vec![tx.clone()]), true, &limits);

        assert!(result.is_item_failure());
        let member = result.tx_result(&tx.wtxid()).unwrap();
        assert_eq!(member.state.result(), Some(TxValidationResult::NotStandard));
        assert_eq!(member.state.reject_reason(), "tx-size");
        assert_eq!(member.vsize, None);
    }

    #[test]
    fn test_pool_refusal_becomes_member_state() {
        let mut chainstate = Chainstate::new();
        chainstate
            .add_coin(funding(1), Coin::new(TxOut::new(FUNDING_VALUE, vec![0x51]), 0, false))
            .unwrap();
        let tiny_pool = Mempool::new(MempoolConfig {
            max_size: 500,
            ..Default::default()
        });
        let lock = ChainLock::new(chainstate, tiny_pool);
        let guard = lock.lock();
        let tx = spend(funding(1), FUNDING_VALUE - 1_000);

        let result = guard.process_new_package(
            &UtxoValidator::default(),
            &Package::new(vec![tx.clone()]),
            false,
            &PackageLimits::default(),
        );

        let member = result.tx_result(&tx.wtxid()).unwrap();
        assert_eq!(member.state.result(), Some(TxValidationResult::MempoolPolicy));
        assert_eq!(member.state.reject_reason(), "tx-size");
        assert!(guard.mempool().is_empty());
    }

    #[test]
    fn test_member_evicted_by_later_member_is_reported() {
        let mut chainstate = Chainstate::new();
        chainstate
            .add_coin(funding(1), Coin::new(TxOut::new(FUNDING_VALUE, vec![0x51]), 0, false))
            .unwrap();
        let two_slot_pool = Mempool::new(MempoolConfig {
            max_transactions: 2,
            ..Default::default()
        });
        let lock = ChainLock::new(chainstate, two_slot_pool);
        let guard = lock.lock();
        let parent = Transaction::new(
            2,
            vec![TxIn::new(funding(1))],
            vec![TxOut::new(40_000, vec![0x51]), TxOut::new(40_000, vec![0x51])],
            0,
        )
        .into_ref();
        let low = spend(OutPoint::new(parent.txid(), 0), 40_000 - 200);
        let high = spend(OutPoint::new(parent.txid(), 1), 40_000 - 10_000);

        let result = guard.process_new_package(
            &UtxoValidator::default(),
            &Package::new(vec![parent.clone(), low.clone(), high.clone()]),
            false,
            &PackageLimits::default(),
        );

        assert!(result.is_item_failure());
        assert_eq!(result.state().reject_reason(), "transaction failed");
        let low_result = result.tx_result(&low.wtxid()).unwrap();
        assert_eq!(low_result.state.result(), Some(TxValidationResult::MempoolPolicy));
        assert_eq!(low_result.state.reject_reason(), "mempool full");
        assert_eq!(low_result.vsize, None);
        assert!(result.tx_result(&parent.wtxid()).unwrap().is_valid());
        assert!(result.tx_result(&high.wtxid()).unwrap().is_valid());

        assert_eq!(guard.mempool().len(), 2);
        assert!(guard.mempool().contains(&parent.txid()));
        assert!(guard.mempool().contains(&high.txid()));
        assert!(!guard.mempool().contains(&low.txid()));
        assert_eq!(result.failed_members().count(), 1);
    }

    #[test]
    fn test_repeated_dry_runs_are_equal() {
        let lock = setup();
        let guard = lock.lock();
        let (parent, child) = chain();
        let package = Package::new(vec![parent, child]);
        let engine = UtxoValidator::default();

        let first = guard.process_new_package(&engine, &package, true, &PackageLimits::default());
        let second = guard.process_new_package(&engine, &package, true, &PackageLimits::default());

        assert_eq!(first, second);
    }
}
