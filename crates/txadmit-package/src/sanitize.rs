//! Static package checks run before any member is validated.

use crate::{Package, PackageLimits, PackageValidationKind, PackageValidationState};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use txadmit_consensus::{OutPoint, Txid};

/// Check a package against the limits and its internal shape.
///
/// Rules, in order:
/// 1. member count
/// 2. aggregate virtual size (multi-member packages only; a lone
///    transaction is judged on its own size by the processor)
/// 3. duplicate members
/// 4. members spending outputs of later members
/// 5. members spending the same outpoint
pub fn check_package(package: &Package, limits: &PackageLimits) -> PackageValidationState {
    if package.len() > limits.max_count {
        return policy_failure(
            "package-too-many-transactions",
            format!("{} transactions, max {}", package.len(), limits.max_count),
        );
    }

    if package.len() > 1 {
        let max_size = limits.max_size_vbytes();
        let mut total = 0usize;
        for tx in package {
            total = total.saturating_add(tx.vsize());
            if total > max_size {
                return policy_failure(
                    "package-too-large",
                    format!("exceeds {} vbytes", max_size),
                );
            }
        }
    }

    let positions: HashMap<Txid, usize> = package
        .iter()
        .enumerate()
        .map(|(i, tx)| (tx.txid(), i))
        .collect();
    if positions.len() != package.len() {
        return policy_failure("package-contains-duplicates", String::new());
    }

    let mut spent: HashSet<OutPoint> = HashSet::new();
    for (i, tx) in package.iter().enumerate() {
        for input in tx.inputs() {
            let outpoint = input.previous_output;
            if let Some(&parent) = positions.get(&outpoint.txid) {
                if parent >= i {
                    return policy_failure(
                        "package-not-sorted",
                        format!("{} spends a later member", tx.txid()),
                    );
                }
            }
            if !spent.insert(outpoint) {
                return policy_failure("conflict-in-package", outpoint.to_string());
            }
        }
    }

    PackageValidationState::valid()
}

fn policy_failure(reason: &str, debug_message: String) -> PackageValidationState {
    debug!(reason, detail = debug_message.as_str(), "Package failed sanitizing");
    PackageValidationState::invalid_with_debug(PackageValidationKind::Policy, reason, debug_message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use txadmit_consensus::{Transaction, TransactionRef, TxIn, TxOut};

    fn spend(outpoints: &[OutPoint], outputs: usize) -> TransactionRef {
        Transaction::new(
            2,
            outpoints.iter().copied().map(TxIn::new).collect(),
            (0..outputs)
                .map(|i| TxOut::new(1_000, vec![0x51, i as u8]))
                .collect(),
            0,
        )
        .into_ref()
    }

    fn funding(n: u8) -> OutPoint {
        OutPoint::new(Txid::from_bytes([n; 32]), 0)
    }

    fn reason(package: Vec<TransactionRef>) -> String {
        check_package(&Package::new(package), &PackageLimits::default())
            .reject_reason()
            .to_string()
    }

    #[test]
    fn test_valid_chain() {
        let parent = spend(&[funding(1)], 2);
        let child = spend(&[OutPoint::new(parent.txid(), 0)], 1);
        let state = check_package(&Package::new(vec![parent, child]), &PackageLimits::default());
        assert!(state.is_valid());
    }

    #[test]
    fn test_empty_package_is_valid() {
        assert!(check_package(&Package::default(), &PackageLimits::default()).is_valid());
    }

    #[test]
    fn test_too_many_transactions() {
        let txs: Vec<_> = (0..26).map(|n| spend(&[funding(n)], 1)).collect();
        let state = check_package(&Package::new(txs), &PackageLimits::default());
        assert!(state.is_invalid());
        assert_eq!(state.result(), Some(PackageValidationKind::Policy));
        assert_eq!(state.reject_reason(), "package-too-many-transactions");
    }

    #[test]
    fn test_count_checked_before_size() {
        let limits = PackageLimits {
            max_count: 2,
            max_size_kvb: 0,
        };
        let txs: Vec<_> = (0..3).map(|n| spend(&[funding(n)], 1)).collect();
        let state = check_package(&Package::new(txs), &limits);
        assert_eq!(state.reject_reason(), "package-too-many-transactions");
    }

    #[test]
    fn test_too_large() {
        let limits = PackageLimits {
            max_count: 25,
            max_size_kvb: 0,
        };
        let txs = vec![spend(&[funding(1)], 1), spend(&[funding(2)], 1)];
        let state = check_package(&Package::new(txs), &limits);
        assert_eq!(state.result(), Some(PackageValidationKind::Policy));
        assert_eq!(state.reject_reason(), "package-too-large");
    }

    #[test]
    fn test_single_member_skips_size_rule() {
        let limits = PackageLimits {
            max_count: 25,
            max_size_kvb: 0,
        };
        let state = check_package(&Package::new(vec![spend(&[funding(1)], 1)]), &limits);
        assert!(state.is_valid());
    }

    #[test]
    fn test_duplicates() {
        let tx = spend(&[funding(1)], 1);
        assert_eq!(reason(vec![tx.clone(), tx]), "package-contains-duplicates");
    }

    #[test]
    fn test_not_sorted() {
        let parent = spend(&[funding(1)], 1);
        let child = spend(&[OutPoint::new(parent.txid(), 0)], 1);
        assert_eq!(reason(vec![child, parent]), "package-not-sorted");
    }

    #[test]
    fn test_conflict_in_package() {
        let a = spend(&[funding(1)], 1);
        let b = spend(&[funding(1)], 2);
        assert_eq!(reason(vec![a, b]), "conflict-in-package");
    }
}
