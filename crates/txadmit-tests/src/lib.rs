//! # txadmit-tests
//!
//! Integration tests for package admission.
//!
//! This crate provides:
//! - Generators for placeholder, chained and oversized transactions
//! - A harness with a 100-block chain whose coinbases are mature
//! - Scenario tests for sanitizing, dry runs and real submission
//! - Property-based tests for limits, idempotence and determinism

pub mod generators;
pub mod harness;




pub use generators::*;
pub use harness::*;
