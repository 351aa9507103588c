//! Ordered group of candidate transactions.

use std::ops::Deref;
use txadmit_consensus::TransactionRef;

/// Candidate transactions submitted together.
///
/// A member may spend outputs of earlier members; order is never changed
/// after construction.
#[derive(Debug, Clone, Default)]
pub struct Package(Vec<TransactionRef>);

impl Package {
    /// Package with members in the given order.
    pub fn new(txs: Vec<TransactionRef>) -> Self {
        Self(txs)
    }

    /// Members in submission order.
    pub fn transactions(&self) -> &[TransactionRef] {
        &self.0
    }

    /// Sum of member virtual sizes.
    pub fn total_vsize(&self) -> usize {
        self.0.iter().map(|tx| tx.vsize()).sum()
    }

    /// Members in package order, consuming the package.
    pub fn into_inner(self) -> Vec<TransactionRef> {
        self.0
    }
}

impl Deref for Package {
    type Target = [TransactionRef];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<TransactionRef>> for Package {
    fn from(txs: Vec<TransactionRef>) -> Self {
        Self(txs)
    }
}

impl FromIterator<TransactionRef> for Package {
    fn from_iter<I: IntoIterator<Item = TransactionRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Package {
    type Item = &'a TransactionRef;
    type IntoIter = std::slice::Iter<'a, TransactionRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
