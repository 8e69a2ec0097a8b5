//! Modelvault: versioned, crash-safe storage for trained anomaly models
//!
//! Persists opaque model artifacts under a stable series key, assigns each
//! write a monotonically increasing version, and guarantees that concurrent
//! writers never corrupt or silently overwrite each other and that readers
//! never observe a partially written artifact.
//!
//! The workspace is layered:
//! - `modelvault-core`: foundational types, errors, and the model/storage
//!   trait seams
//! - `modelvault-models`: concrete model implementations and their factory
//! - `modelvault-storage`: lock manager, atomic writer, and the filesystem
//!   and object-store backends
//!
//! This crate wires the layers together from configuration:
//!
//! ```no_run
//! use modelvault::{SeriesKey, Vault, VaultConfig};
//!
//! # fn main() -> modelvault::Result<()> {
//! let vault = Vault::open(VaultConfig::default())?;
//! let series = SeriesKey::new("cpu-load")?;
//!
//! let mut model = vault.new_model()?;
//! model.fit(&modelvault::TimeSeries::from_values([1.0, 1.2, 0.9, 1.1]))?;
//! let version = vault.save(&series, model.as_ref())?;
//!
//! let (loaded, _) = vault.load(&series, Some(version))?;
//! assert!(loaded.is_fitted());
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use config::{VaultConfig, CONFIG_FILE_NAME};
pub use modelvault_core::{
    next_version, AnomalyModel, ArtifactMetadata, DataPoint, ModelStorage, Result, SeriesKey,
    StoreError, TimeSeries, Version,
};
pub use modelvault_models::{
    ModelFactory, ModelSettings, RobustModel, RobustSettings, StatisticalModel,
    StatisticalSettings,
};
pub use modelvault_storage::{
    FilesystemStorage, InMemoryObjectClient, ObjectClient, ObjectStoreStorage, SeriesLockManager,
    StorageFactory, StorageSettings,
};

use std::path::Path;
use std::sync::Arc;

/// A configured model store: backend plus model factory
///
/// Owns the storage backend selected by configuration and the model factory
/// used both for training new models and for hydrating loaded artifacts.
/// Both tags are validated at open time, so a configuration typo fails at
/// startup rather than on first use.
pub struct Vault {
    storage: Box<dyn ModelStorage>,
    models: Arc<ModelFactory>,
    model_type: String,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("model_type", &self.model_type)
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Assemble a vault from configuration
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedType`] if the configured model or
    /// storage tag is unknown, or an I/O error if the filesystem root cannot
    /// be created.
    pub fn open(config: VaultConfig) -> Result<Self> {
        let models = Arc::new(ModelFactory::new(config.models));
        // Validate the model tag eagerly; a bad tag would otherwise only
        // surface on the first train or load.
        models.create(&config.model_type)?;

        let storage = StorageFactory::create(
            &config.storage_type,
            &config.storage,
            config.lock_timeout(),
            Arc::clone(&models),
        )?;

        tracing::info!(
            storage_type = %config.storage_type,
            model_type = %config.model_type,
            "opened model vault"
        );
        Ok(Vault {
            storage,
            models,
            model_type: config.model_type,
        })
    }

    /// Assemble a vault from a `modelvault.toml` file
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the file is unreadable or
    /// malformed, plus everything [`Vault::open`] can return.
    pub fn open_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Vault::open(VaultConfig::from_file(path.as_ref())?)
    }

    /// Construct an unfitted model of the configured type
    pub fn new_model(&self) -> Result<Box<dyn AnomalyModel>> {
        self.models.create(&self.model_type)
    }

    /// The model factory shared with the storage backend
    pub fn models(&self) -> &Arc<ModelFactory> {
        &self.models
    }

    /// The underlying storage backend
    pub fn storage(&self) -> &dyn ModelStorage {
        self.storage.as_ref()
    }

    /// Persist a fitted model under the next version of the series
    pub fn save(&self, series: &SeriesKey, model: &dyn AnomalyModel) -> Result<Version> {
        self.storage.save(series, model, None)
    }

    /// Load a model, resolving `None` to the latest committed version
    pub fn load(
        &self,
        series: &SeriesKey,
        version: Option<Version>,
    ) -> Result<(Box<dyn AnomalyModel>, Version)> {
        self.storage.load(series, version)
    }

    /// Highest committed version of the series, or `None`
    pub fn latest_version(&self, series: &SeriesKey) -> Result<Option<Version>> {
        self.storage.latest_version(series)
    }

    /// All committed versions of the series, ascending
    pub fn list_versions(&self, series: &SeriesKey) -> Result<Vec<Version>> {
        self.storage.list_versions(series)
    }

    /// All series with at least one committed version
    pub fn list_series(&self) -> Result<Vec<SeriesKey>> {
        self.storage.list_series()
    }

    /// Whether the series (or a specific version) is committed
    pub fn exists(&self, series: &SeriesKey, version: Option<Version>) -> bool {
        self.storage.exists(series, version)
    }
}
