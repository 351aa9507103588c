//! Validation outcome records.
//!
//! A `ValidationState` is produced once by whoever validated something and is
//! read-only afterwards: it can only be built through `valid`, `invalid` or
//! `error`. The result kind parameter lets transaction-level and
//! package-level outcomes share one representation.

use serde::Serialize;
use std::fmt;

/// Overall validity of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Everything checked out.
    Valid,
    /// Rejected by a validation rule.
    Invalid,
    /// Validation could not be completed.
    Error,
}

/// Outcome of validating one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationState<R> {
    mode: ValidationMode,
    result: Option<R>,
    reject_reason: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    debug_message: String,
}

impl<R: Copy> ValidationState<R> {
    /// A valid state with no result kind or reason.
    pub fn valid() -> Self {
        Self {
            mode: ValidationMode::Valid,
            result: None,
            reject_reason: String::new(),
            debug_message: String::new(),
        }
    }

    /// An invalid state with a result kind and reject reason.
    pub fn invalid(result: R, reject_reason: impl Into<String>) -> Self {
        Self::invalid_with_debug(result, reject_reason, String::new())
    }

    /// An invalid state carrying extra detail for logs.
    pub fn invalid_with_debug(
        result: R,
        reject_reason: impl Into<String>,
        debug_message: impl Into<String>,
    ) -> Self {
        Self {
            mode: ValidationMode::Invalid,
            result: Some(result),
            reject_reason: reject_reason.into(),
            debug_message: debug_message.into(),
        }
    }

    /// Validation could not run to completion.
    pub fn error(reject_reason: impl Into<String>) -> Self {
        Self {
            mode: ValidationMode::Error,
            result: None,
            reject_reason: reject_reason.into(),
            debug_message: String::new(),
        }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn is_valid(&self) -> bool {
        self.mode == ValidationMode::Valid
    }

    pub fn is_invalid(&self) -> bool {
        self.mode == ValidationMode::Invalid
    }

    pub fn is_error(&self) -> bool {
        self.mode == ValidationMode::Error
    }

    /// Result kind; `None` when unset (valid or error states).
    pub fn result(&self) -> Option<R> {
        self.result
    }

    /// Short machine-readable reason, empty when valid.
    pub fn reject_reason(&self) -> &str {
        &self.reject_reason
    }

    pub fn debug_message(&self) -> &str {
        &self.debug_message
    }
}

impl<R: Copy> Default for ValidationState<R> {
    fn default() -> Self {
        Self::valid()
    }
}

impl<R> fmt::Display for ValidationState<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mode == ValidationMode::Valid {
            return f.write_str("Valid");
        }
        if self.debug_message.is_empty() {
            f.write_str(&self.reject_reason)
        } else {
            write!(f, "{}, {}", self.reject_reason, self.debug_message)
        }
    }
}

/// Why a single transaction was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxValidationResult {
    /// Violates a consensus rule.
    Consensus,
    /// Violates a standardness rule (size, shape).
    NotStandard,
    /// Spends an output that cannot be found.
    MissingInputs,
    /// Spends a coinbase output before maturity.
    PrematureSpend,
    /// Conflicts with a pool transaction or an earlier package member.
    Conflict,
    /// Rejected by local pool policy (fee, capacity).
    MempoolPolicy,
}

/// Per-transaction validation state.
pub type TxValidationState = ValidationState<TxValidationResult>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_state_has_no_reason() {
        let state = TxValidationState::valid();
        assert!(state.is_valid());
        assert!(!state.is_invalid());
        assert_eq!(state.result(), None);
        assert_eq!(state.reject_reason(), "");
        assert_eq!(state.to_string(), "Valid");
    }

    #[test]
    fn test_invalid_state_keeps_kind_and_reason() {
        let state = TxValidationState::invalid_with_debug(
            TxValidationResult::NotStandard,
            "tx-size",
            "vsize 120000",
        );
        assert!(state.is_invalid());
        assert_eq!(state.result(), Some(TxValidationResult::NotStandard));
        assert_eq!(state.reject_reason(), "tx-size");
        assert_eq!(state.to_string(), "tx-size, vsize 120000");
    }

    #[test]
    fn test_error_state() {
        let state = TxValidationState::error("pool unavailable");
        assert!(state.is_error());
        assert!(!state.is_valid());
        assert_eq!(state.result(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let state = TxValidationState::invalid(TxValidationResult::MissingInputs, "missing");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["mode"], "invalid");
        assert_eq!(json["result"], "missing_inputs");
        assert_eq!(json["reject_reason"], "missing");
        assert!(json.get("debug_message").is_none());
    }
}
