//! Storage factory: configuration tag to concrete backend
//!
//! Instantiates a backend from its configured tag so the persistence layer
//! is chosen by configuration rather than compiled in. Unknown tags are a
//! configuration error and fail at construction time.

use crate::filesystem::{FilesystemSettings, FilesystemStorage};
use crate::object_store::{InMemoryObjectClient, ObjectStoreSettings, ObjectStoreStorage};
use modelvault_core::{ModelStorage, Result, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Per-backend storage settings, one section per known tag
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Settings for the `"filesystem"` backend
    #[serde(default)]
    pub filesystem: FilesystemSettings,
    /// Settings for the `"object-store"` backend
    #[serde(default)]
    pub object_store: ObjectStoreSettings,
}

/// Creates storage backends based on the configured type tag
#[derive(Debug, Clone, Copy)]
pub struct StorageFactory;

impl StorageFactory {
    /// Tags this factory can construct
    pub fn supported_types() -> &'static [&'static str] {
        &[
            FilesystemStorage::STORAGE_TYPE,
            ObjectStoreStorage::STORAGE_TYPE,
        ]
    }

    /// Instantiate the backend selected by `tag`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedType`] for an unknown tag, or an I/O
    /// error if the filesystem root cannot be created.
    pub fn create(
        tag: &str,
        settings: &StorageSettings,
        lock_timeout: Duration,
        models: Arc<modelvault_models::ModelFactory>,
    ) -> Result<Box<dyn ModelStorage>> {
        match tag {
            FilesystemStorage::STORAGE_TYPE => Ok(Box::new(FilesystemStorage::open(
                &settings.filesystem.root,
                lock_timeout,
                models,
            )?)),
            ObjectStoreStorage::STORAGE_TYPE => Ok(Box::new(ObjectStoreStorage::new(
                Arc::new(InMemoryObjectClient::new()),
                &settings.object_store,
                lock_timeout,
                models,
            ))),
            other => Err(StoreError::UnsupportedType {
                kind: "storage",
                tag: other.to_string(),
            }),
        }
    }
}
