//! Admission configuration.

use crate::PackageLimits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use txadmit_consensus::ValidationConfig;
use txadmit_mempool::MempoolConfig;

/// Complete admission configuration.
///
/// Every section is optional in the TOML source and falls back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Package limits.
    #[serde(default)]
    pub package: PackageLimits,
    /// Pool configuration.
    #[serde(default)]
    pub mempool: MempoolConfig,
    /// Per-transaction validation policy.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl AdmissionConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Load configuration from file, or defaults if it does not exist.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", config_path.display()))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AdmissionConfig::from_toml_str("").unwrap();
        assert_eq!(config, AdmissionConfig::default());
        assert_eq!(config.package.max_count, 25);
        assert_eq!(config.package.max_size_kvb, 101);
    }

    #[test]
    fn test_partial_sections() {
        let config = AdmissionConfig::from_toml_str(
            r#"
            [package]
            max_count = 10

            [mempool]
            max_transactions = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.package.max_count, 10);
        assert_eq!(config.package.max_size_kvb, 101);
        assert_eq!(config.mempool.max_transactions, 50);
        assert_eq!(config.validation, ValidationConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = AdmissionConfig::from_toml_str("[package]\nmax_count = \"many\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("admission.toml");
        let mut config = AdmissionConfig::default();
        config.package.max_count = 5;

        config.save(&path).unwrap();
        let loaded = AdmissionConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AdmissionConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AdmissionConfig::default());
    }
}
