//! Vault configuration via `modelvault.toml`
//!
//! A single TOML document selects the active model and storage backend and
//! carries one settings section per known type. To change backends, edit the
//! file and reopen the vault.

use modelvault_core::{Result, StoreError};
use modelvault_models::ModelSettings;
use modelvault_storage::StorageSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "modelvault.toml";

/// Vault configuration
///
/// # Example
///
/// ```toml
/// model_type = "statistical"
/// storage_type = "filesystem"
/// lock_timeout_secs = 10
///
/// [statistical]
/// threshold = 3.0
///
/// [filesystem]
/// root = "./model_storage"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Active model type: `"statistical"` or `"robust"`
    #[serde(default = "default_model_type")]
    pub model_type: String,
    /// Active storage backend: `"filesystem"` or `"object-store"`
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
    /// Wait budget for per-series lock acquisition, in seconds
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
    /// Per-model settings sections
    #[serde(flatten)]
    pub models: ModelSettings,
    /// Per-backend settings sections
    #[serde(flatten)]
    pub storage: StorageSettings,
}

fn default_model_type() -> String {
    "statistical".to_string()
}

fn default_storage_type() -> String {
    "filesystem".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    10
}

impl Default for VaultConfig {
    fn default() -> Self {
        VaultConfig {
            model_type: default_model_type(),
            storage_type: default_storage_type(),
            lock_timeout_secs: default_lock_timeout_secs(),
            models: ModelSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl VaultConfig {
    /// Lock wait budget as a `Duration`
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Returns the default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# Modelvault configuration
#
# Active model type: "statistical" (default) or "robust"
#   "statistical" = mean + threshold x std-dev cutoff
#   "robust"      = median + threshold x MAD cutoff
model_type = "statistical"

# Active storage backend: "filesystem" (default) or "object-store"
storage_type = "filesystem"

# Wait budget for per-series lock acquisition, in seconds.
lock_timeout_secs = 10

[statistical]
threshold = 3.0

[robust]
threshold = 3.0

[filesystem]
root = "./model_storage"

# [object_store]
# bucket = "my-models"
# prefix = "models"
"#
    }

    /// Read and parse config from a file path
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            StoreError::Config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                StoreError::Config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StoreError::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            StoreError::Config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
