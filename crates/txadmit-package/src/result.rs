//! Package admission outcomes.

use serde::Serialize;
use std::collections::BTreeMap;
use txadmit_consensus::{TxValidationState, ValidationState, Wtxid};

/// Reason reported when any member fails.
pub const TX_FAILED_REASON: &str = "transaction failed";

/// Why a package as a whole was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageValidationKind {
    /// The package itself is malformed (limits, ordering, duplicates).
    Policy,
    /// At least one member failed validation.
    Tx,
}

/// Aggregate state of a package.
pub type PackageValidationState = ValidationState<PackageValidationKind>;

/// Outcome for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxAcceptResult {
    pub state: TxValidationState,
    /// Virtual size, set when the member validated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vsize: Option<usize>,
    /// Fee, set when the member validated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<u64>,
}

impl TxAcceptResult {
    pub fn accepted(vsize: usize, fee: u64) -> Self {
        Self {
            state: TxValidationState::valid(),
            vsize: Some(vsize),
            fee: Some(fee),
        }
    }

    pub fn rejected(state: TxValidationState) -> Self {
        Self {
            state,
            vsize: None,
            fee: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }
}

/// Aggregate state plus per-member results keyed by witness id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageValidationResult {
    state: PackageValidationState,
    tx_results: BTreeMap<Wtxid, TxAcceptResult>,
}

impl PackageValidationResult {
    pub(crate) fn new(
        state: PackageValidationState,
        tx_results: BTreeMap<Wtxid, TxAcceptResult>,
    ) -> Self {
        Self { state, tx_results }
    }

    /// Rejected before any member was validated.
    pub(crate) fn policy_failure(state: PackageValidationState) -> Self {
        Self::new(state, BTreeMap::new())
    }

    pub fn state(&self) -> &PackageValidationState {
        &self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }

    pub fn tx_results(&self) -> &BTreeMap<Wtxid, TxAcceptResult> {
        &self.tx_results
    }

    pub fn tx_result(&self, wtxid: &Wtxid) -> Option<&TxAcceptResult> {
        self.tx_results.get(wtxid)
    }

    pub fn is_policy_failure(&self) -> bool {
        self.state.result() == Some(PackageValidationKind::Policy)
    }

    pub fn is_item_failure(&self) -> bool {
        self.state.result() == Some(PackageValidationKind::Tx)
    }

    /// Members that did not validate, in witness id order.
    pub fn failed_members(&self) -> impl Iterator<Item = (&Wtxid, &TxAcceptResult)> {
        self.tx_results.iter().filter(|(_, r)| !r.is_valid())
    }
}
