//! # txadmit-package
//!
//! Admission of dependent transaction packages into the pool.
//!
//! This crate provides:
//! - Package limits (`MAX_PACKAGE_COUNT`, `MAX_PACKAGE_SIZE`)
//! - `check_package`, the static sanitizer
//! - `process_new_package`, per-member validation and commit
//! - The package result model keyed by witness id
//! - `ChainLock`/`ChainGuard`, the exclusive chain and pool access token
//! - `AdmissionConfig`, loaded from TOML

mod config;
mod lock;
mod package;
mod policy;
mod processor;
mod result;
mod sanitize;

pub use config::AdmissionConfig;
pub use lock::{ChainGuard, ChainLock};
pub use package::Package;
pub use policy::{PackageLimits, MAX_PACKAGE_COUNT, MAX_PACKAGE_SIZE};
pub use processor::process_new_package;
pub use result::{
    PackageValidationKind, PackageValidationResult, PackageValidationState, TxAcceptResult,
    TX_FAILED_REASON,
};
pub use sanitize::check_package;
