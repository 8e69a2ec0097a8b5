//! Remote object-store storage backend
//!
//! Exposes the same contract as the filesystem backend over a minimal
//! object-store client trait. Object keys mirror the on-disk layout:
//!
//! ```text
//! {prefix}/{series}/v0.bin
//! {prefix}/{series}/v0.meta.json
//! ```
//!
//! Object stores commit whole objects atomically, so no temp-and-rename
//! dance is needed: the metadata put is the commit point. Both puts go
//! through `put_if_absent` — a conditional write that refuses to land on an
//! occupied key, so even a writer outside this process cannot silently
//! overwrite a committed version or its payload.
//!
//! The bundled [`InMemoryObjectClient`] stands in for a real S3/GCS client;
//! [`ObjectClient`] is the seam where one would plug in.

use crate::lock::SeriesLockManager;
use modelvault_core::{
    next_version, AnomalyModel, ArtifactMetadata, ModelStorage, Result, SeriesKey, StoreError,
    Version,
};
use modelvault_models::ModelFactory;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const PAYLOAD_EXT: &str = ".bin";
const METADATA_EXT: &str = ".meta.json";

/// Settings for the object-store backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStoreSettings {
    /// Bucket holding all artifacts
    #[serde(default)]
    pub bucket: String,
    /// Key prefix under which artifacts are stored
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "models".to_string()
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        ObjectStoreSettings {
            bucket: String::new(),
            prefix: default_prefix(),
        }
    }
}

/// Minimal object-store client surface
///
/// Mirrors the handful of primitives every object store offers: whole-object
/// put/get, listing by prefix, an existence probe, and a conditional put
/// that fails on an occupied key.
pub trait ObjectClient: Send + Sync {
    /// Store an object, replacing any existing one
    fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Store an object only if the key is unoccupied; returns whether it won
    fn put_if_absent(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<bool>;

    /// Fetch an object, `None` if absent
    fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// All keys under a prefix, in no particular order
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Whether an object exists at the key
    fn exists(&self, bucket: &str, key: &str) -> Result<bool>;
}

/// In-memory object-store client for tests and single-process deployments
#[derive(Debug, Default)]
pub struct InMemoryObjectClient {
    objects: DashMap<(String, String), Vec<u8>>,
}

impl InMemoryObjectClient {
    /// Create an empty client
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectClient for InMemoryObjectClient {
    fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    fn put_if_absent(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<bool> {
        match self
            .objects
            .entry((bucket.to_string(), key.to_string()))
        {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(bytes);
                Ok(true)
            }
        }
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == bucket && entry.key().1.starts_with(prefix))
            .map(|entry| entry.key().1.clone())
            .collect())
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .objects
            .contains_key(&(bucket.to_string(), key.to_string())))
    }
}

/// Stores model artifacts in a remote object store
pub struct ObjectStoreStorage {
    client: Arc<dyn ObjectClient>,
    bucket: String,
    prefix: String,
    locks: SeriesLockManager,
    factory: Arc<ModelFactory>,
}

impl std::fmt::Debug for ObjectStoreStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreStorage")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreStorage {
    /// Type tag used by the storage factory
    pub const STORAGE_TYPE: &'static str = "object-store";

    /// Create a backend over the given client and bucket
    pub fn new(
        client: Arc<dyn ObjectClient>,
        settings: &ObjectStoreSettings,
        lock_timeout: Duration,
        factory: Arc<ModelFactory>,
    ) -> Self {
        ObjectStoreStorage {
            client,
            bucket: settings.bucket.clone(),
            prefix: settings.prefix.trim_matches('/').to_string(),
            locks: SeriesLockManager::new(lock_timeout),
            factory,
        }
    }

    fn series_prefix(&self, series: &SeriesKey) -> String {
        if self.prefix.is_empty() {
            format!("{}/", series)
        } else {
            format!("{}/{}/", self.prefix, series)
        }
    }

    fn object_key(&self, series: &SeriesKey, version: Version, ext: &str) -> String {
        format!("{}{}{}", self.series_prefix(series), version, ext)
    }

    /// Versions whose metadata object is present and parseable
    ///
    /// Must be called with the series lock held.
    fn committed_versions(&self, series: &SeriesKey) -> Result<BTreeSet<Version>> {
        let mut versions = BTreeSet::new();
        for version in self.named_versions(series, METADATA_EXT)? {
            let key = self.object_key(series, version, METADATA_EXT);
            match self.client.get(&self.bucket, &key)? {
                Some(bytes) if serde_json::from_slice::<ArtifactMetadata>(&bytes).is_ok() => {
                    versions.insert(version);
                }
                Some(_) => {
                    warn!(
                        series = %series,
                        version = %version,
                        "excluding version with unreadable metadata"
                    );
                }
                // Deleted between list and get; treat as never committed.
                None => {}
            }
        }
        Ok(versions)
    }

    /// Every version that has ever claimed an object name in the series
    fn occupied_versions(&self, series: &SeriesKey) -> Result<BTreeSet<Version>> {
        let mut versions = self.named_versions(series, METADATA_EXT)?;
        versions.append(&mut self.named_versions(series, PAYLOAD_EXT)?);
        Ok(versions)
    }

    fn named_versions(&self, series: &SeriesKey, ext: &str) -> Result<BTreeSet<Version>> {
        let prefix = self.series_prefix(series);
        let mut versions = BTreeSet::new();
        for key in self.client.list(&self.bucket, &prefix)? {
            let Some(name) = key.strip_prefix(&prefix) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(ext) else {
                continue;
            };
            if let Ok(version) = stem.parse::<Version>() {
                versions.insert(version);
            }
        }
        Ok(versions)
    }

    fn resolve_latest(&self, series: &SeriesKey) -> Result<Version> {
        self.committed_versions(series)?
            .iter()
            .next_back()
            .copied()
            .ok_or_else(|| StoreError::not_found(series.as_str()))
    }

    fn exists_inner(&self, series: &SeriesKey, version: Option<Version>) -> Result<bool> {
        let _guard = self.locks.acquire(series)?;
        match version {
            Some(version) => {
                let meta_key = self.object_key(series, version, METADATA_EXT);
                let payload_key = self.object_key(series, version, PAYLOAD_EXT);
                Ok(self.client.exists(&self.bucket, &meta_key)?
                    && self.client.exists(&self.bucket, &payload_key)?)
            }
            None => Ok(!self.committed_versions(series)?.is_empty()),
        }
    }
}

impl ModelStorage for ObjectStoreStorage {
    fn save(
        &self,
        series: &SeriesKey,
        model: &dyn AnomalyModel,
        version: Option<Version>,
    ) -> Result<Version> {
        if !model.is_fitted() {
            return Err(StoreError::UnfittedModel);
        }

        let _guard = self.locks.acquire(series)?;

        let occupied = self.occupied_versions(series)?;
        let version = match version {
            Some(explicit) => {
                if occupied.contains(&explicit) {
                    return Err(StoreError::VersionConflict {
                        series: series.to_string(),
                        version: explicit,
                    });
                }
                explicit
            }
            None => next_version(&occupied),
        };

        let payload = model.to_bytes()?;
        let payload_key = self.object_key(series, version, PAYLOAD_EXT);
        if !self
            .client
            .put_if_absent(&self.bucket, &payload_key, payload.clone())?
        {
            return Err(StoreError::VersionConflict {
                series: series.to_string(),
                version,
            });
        }

        let metadata =
            ArtifactMetadata::new(series.clone(), version, model.model_type(), &payload);
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)?;
        let metadata_key = self.object_key(series, version, METADATA_EXT);
        if !self
            .client
            .put_if_absent(&self.bucket, &metadata_key, metadata_bytes)?
        {
            // A writer outside this process claimed the version between our
            // scan and the conditional put.
            return Err(StoreError::VersionConflict {
                series: series.to_string(),
                version,
            });
        }

        info!(
            series = %series,
            version = %version,
            model_type = model.model_type(),
            bucket = %self.bucket,
            "uploaded model artifact"
        );
        Ok(version)
    }

    fn load(
        &self,
        series: &SeriesKey,
        version: Option<Version>,
    ) -> Result<(Box<dyn AnomalyModel>, Version)> {
        let _guard = self.locks.acquire(series)?;

        let version = match version {
            Some(explicit) => explicit,
            None => self.resolve_latest(series)?,
        };

        let metadata_key = self.object_key(series, version, METADATA_EXT);
        let metadata_bytes = self
            .client
            .get(&self.bucket, &metadata_key)?
            .ok_or_else(|| StoreError::version_not_found(series.as_str(), version))?;
        let metadata: ArtifactMetadata = serde_json::from_slice(&metadata_bytes)
            .map_err(|e| StoreError::corrupted(series.as_str(), version, e.to_string()))?;

        let payload_key = self.object_key(series, version, PAYLOAD_EXT);
        let payload = self
            .client
            .get(&self.bucket, &payload_key)?
            .ok_or_else(|| {
                StoreError::corrupted(series.as_str(), version, "payload object missing")
            })?;
        if !metadata.verify_payload(&payload) {
            return Err(StoreError::corrupted(
                series.as_str(),
                version,
                "payload checksum mismatch",
            ));
        }

        let mut model = self.factory.create_blank(&metadata.model_type)?;
        model.from_bytes(&payload)?;

        debug!(
            series = %series,
            version = %version,
            model_type = %metadata.model_type,
            "downloaded model artifact"
        );
        Ok((model, version))
    }

    fn latest_version(&self, series: &SeriesKey) -> Result<Option<Version>> {
        let _guard = self.locks.acquire(series)?;
        Ok(self.committed_versions(series)?.iter().next_back().copied())
    }

    fn list_versions(&self, series: &SeriesKey) -> Result<Vec<Version>> {
        let _guard = self.locks.acquire(series)?;
        Ok(self.committed_versions(series)?.into_iter().collect())
    }

    fn list_series(&self) -> Result<Vec<SeriesKey>> {
        let root = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        };

        let mut series = BTreeSet::new();
        for key in self.client.list(&self.bucket, &root)? {
            let Some(rest) = key.strip_prefix(&root) else {
                continue;
            };
            let Some((name, object)) = rest.split_once('/') else {
                continue;
            };
            // Only metadata objects mark a committed version.
            if !object.ends_with(METADATA_EXT) {
                continue;
            }
            match SeriesKey::new(name) {
                Ok(key) => {
                    series.insert(key);
                }
                Err(_) => {
                    warn!(segment = %name, "skipping object key that is not a valid series key");
                }
            }
        }
        Ok(series.into_iter().collect())
    }

    fn exists(&self, series: &SeriesKey, version: Option<Version>) -> bool {
        match self.exists_inner(series, version) {
            Ok(committed) => committed,
            Err(e) => {
                warn!(series = %series, error = %e, "existence check failed, reporting absent");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelvault_core::TimeSeries;

    fn key(s: &str) -> SeriesKey {
        SeriesKey::new(s).unwrap()
    }

    fn open_store() -> ObjectStoreStorage {
        let settings = ObjectStoreSettings {
            bucket: "models-test".to_string(),
            prefix: "models".to_string(),
        };
        ObjectStoreStorage::new(
            Arc::new(InMemoryObjectClient::new()),
            &settings,
            Duration::from_secs(5),
            Arc::new(ModelFactory::default()),
        )
    }

    fn fitted_model() -> Box<dyn AnomalyModel> {
        let mut model = ModelFactory::default().create("statistical").unwrap();
        model
            .fit(&TimeSeries::from_values([1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        model
    }

    #[test]
    fn save_load_round_trip() {
        let store = open_store();
        let model = fitted_model();
        let series = key("s1");

        let version = store.save(&series, model.as_ref(), None).unwrap();
        let (loaded, loaded_version) = store.load(&series, None).unwrap();

        assert_eq!(version, Version::INITIAL);
        assert_eq!(loaded_version, version);
        assert!(loaded.is_fitted());
    }

    #[test]
    fn versions_increment_and_list_ascending() {
        let store = open_store();
        let model = fitted_model();
        let series = key("s1");

        for expected in 0u64..3 {
            let version = store.save(&series, model.as_ref(), None).unwrap();
            assert_eq!(version, Version::new(expected));
        }
        assert_eq!(
            store.list_versions(&series).unwrap(),
            vec![Version::new(0), Version::new(1), Version::new(2)]
        );
    }

    #[test]
    fn unfitted_save_is_rejected() {
        let store = open_store();
        let unfitted = ModelFactory::default().create("statistical").unwrap();
        let err = store.save(&key("s1"), unfitted.as_ref(), None).unwrap_err();
        assert!(matches!(err, StoreError::UnfittedModel));
    }

    #[test]
    fn missing_series_and_version_not_found() {
        let store = open_store();
        assert!(matches!(
            store.load(&key("missing"), None).unwrap_err(),
            StoreError::NotFound { .. }
        ));

        let model = fitted_model();
        store.save(&key("s1"), model.as_ref(), None).unwrap();
        assert!(matches!(
            store.load(&key("s1"), Some(Version::new(99))).unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn conditional_put_refuses_occupied_version() {
        let settings = ObjectStoreSettings {
            bucket: "models-test".to_string(),
            prefix: "models".to_string(),
        };
        let client = Arc::new(InMemoryObjectClient::new());
        let store = ObjectStoreStorage::new(
            Arc::clone(&client) as Arc<dyn ObjectClient>,
            &settings,
            Duration::from_secs(5),
            Arc::new(ModelFactory::default()),
        );
        let model = fitted_model();
        let series = key("s1");

        // An out-of-process writer drops metadata onto v0 behind our back.
        client
            .put(
                "models-test",
                "models/s1/v0.meta.json",
                b"{}".to_vec(),
            )
            .unwrap();

        let err = store
            .save(&series, model.as_ref(), Some(Version::INITIAL))
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[test]
    fn unparseable_metadata_is_excluded_but_blocks_reuse() {
        let settings = ObjectStoreSettings {
            bucket: "b".to_string(),
            prefix: "models".to_string(),
        };
        let client = Arc::new(InMemoryObjectClient::new());
        let store = ObjectStoreStorage::new(
            Arc::clone(&client) as Arc<dyn ObjectClient>,
            &settings,
            Duration::from_secs(5),
            Arc::new(ModelFactory::default()),
        );
        let model = fitted_model();
        let series = key("s1");
        store.save(&series, model.as_ref(), None).unwrap();

        client
            .put("b", "models/s1/v1.meta.json", b"garbage".to_vec())
            .unwrap();

        assert_eq!(
            store.list_versions(&series).unwrap(),
            vec![Version::INITIAL]
        );
        let next = store.save(&series, model.as_ref(), None).unwrap();
        assert_eq!(next, Version::new(2));
    }

    #[test]
    fn list_series_requires_committed_metadata() {
        let settings = ObjectStoreSettings {
            bucket: "b".to_string(),
            prefix: "models".to_string(),
        };
        let client = Arc::new(InMemoryObjectClient::new());
        let store = ObjectStoreStorage::new(
            Arc::clone(&client) as Arc<dyn ObjectClient>,
            &settings,
            Duration::from_secs(5),
            Arc::new(ModelFactory::default()),
        );
        let model = fitted_model();
        store.save(&key("series-a"), model.as_ref(), None).unwrap();

        // Payload-only series must not be reported.
        client
            .put("b", "models/partial/v0.bin", b"x".to_vec())
            .unwrap();

        assert_eq!(store.list_series().unwrap(), vec![key("series-a")]);
    }

    #[test]
    fn exists_reports_committed_versions() {
        let store = open_store();
        let model = fitted_model();
        let series = key("s1");
        let version = store.save(&series, model.as_ref(), None).unwrap();

        assert!(store.exists(&series, None));
        assert!(store.exists(&series, Some(version)));
        assert!(!store.exists(&series, Some(Version::new(7))));
        assert!(!store.exists(&key("other"), None));
    }
}
