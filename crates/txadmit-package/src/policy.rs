//! Package limits.

use serde::{Deserialize, Serialize};

/// Maximum number of transactions in a package.
pub const MAX_PACKAGE_COUNT: usize = 25;

/// Maximum aggregate virtual size of a package, in thousands of vbytes.
pub const MAX_PACKAGE_SIZE: usize = 101;

/// Limits shared by the sanitizer and the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageLimits {
    /// Maximum number of members.
    pub max_count: usize,
    /// Maximum aggregate virtual size in kvB.
    pub max_size_kvb: usize,
}

impl PackageLimits {
    /// Size limit in vbytes.
    pub fn max_size_vbytes(&self) -> usize {
        self.max_size_kvb.saturating_mul(1000)
    }
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            max_count: MAX_PACKAGE_COUNT,
            max_size_kvb: MAX_PACKAGE_SIZE,
        }
    }
}
