//! Local-filesystem storage backend
//!
//! Layout: one directory per series key under the storage root; each version
//! is a payload file plus a metadata document named by the version value:
//!
//! ```text
//! <root>/<series>/v0.bin
//! <root>/<series>/v0.meta.json
//! <root>/<series>/v1.bin
//! ...
//! ```
//!
//! Both files are committed through the atomic writer, payload first. The
//! metadata rename is the durability point: a version is committed exactly
//! when its metadata document is fully in place, so a crash mid-save leaves
//! at worst a bare payload (or a stranded temporary) that never appears in
//! version listings.
//!
//! Version allocation scans file *names* rather than committed metadata:
//! anything that ever claimed `v{n}` — including a corrupt or half-written
//! version — permanently blocks reuse of `v{n}`.

use crate::atomic;
use crate::lock::SeriesLockManager;
use modelvault_core::{
    next_version, AnomalyModel, ArtifactMetadata, ModelStorage, Result, SeriesKey, StoreError,
    Version,
};
use modelvault_models::ModelFactory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const PAYLOAD_EXT: &str = ".bin";
const METADATA_EXT: &str = ".meta.json";

/// Settings for the filesystem backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesystemSettings {
    /// Directory holding all series subdirectories
    #[serde(default = "default_root")]
    pub root: String,
}

fn default_root() -> String {
    "./model_storage".to_string()
}

impl Default for FilesystemSettings {
    fn default() -> Self {
        FilesystemSettings {
            root: default_root(),
        }
    }
}

/// Stores model artifacts on local disk
pub struct FilesystemStorage {
    root: PathBuf,
    locks: SeriesLockManager,
    factory: Arc<ModelFactory>,
}

impl std::fmt::Debug for FilesystemStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesystemStorage")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FilesystemStorage {
    /// Type tag used by the storage factory
    pub const STORAGE_TYPE: &'static str = "filesystem";

    /// Open (creating if needed) a storage root
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the root directory cannot be created.
    pub fn open(
        root: impl Into<PathBuf>,
        lock_timeout: Duration,
        factory: Arc<ModelFactory>,
    ) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(FilesystemStorage {
            root,
            locks: SeriesLockManager::new(lock_timeout),
            factory,
        })
    }

    /// The storage root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn series_dir(&self, series: &SeriesKey) -> PathBuf {
        self.root.join(series.as_str())
    }

    fn payload_name(version: Version) -> String {
        format!("{}{}", version, PAYLOAD_EXT)
    }

    fn metadata_name(version: Version) -> String {
        format!("{}{}", version, METADATA_EXT)
    }

    /// Versions whose metadata is fully committed and parseable
    ///
    /// Must be called with the series lock held. Entries with unreadable or
    /// malformed metadata are excluded and logged; the files stay on disk.
    fn committed_versions(&self, series: &SeriesKey) -> Result<BTreeSet<Version>> {
        let dir = self.series_dir(series);
        let mut versions = BTreeSet::new();
        for (version, path) in Self::versioned_entries(&dir, METADATA_EXT)? {
            match Self::read_metadata(&path) {
                Ok(_) => {
                    versions.insert(version);
                }
                Err(e) => {
                    warn!(
                        series = %series,
                        version = %version,
                        error = %e,
                        "excluding version with unreadable metadata"
                    );
                }
            }
        }
        Ok(versions)
    }

    /// Every version that has ever claimed a file name in the series
    ///
    /// Used for allocation so that corrupt or half-written versions are
    /// never reassigned. Must be called with the series lock held.
    fn occupied_versions(&self, series: &SeriesKey) -> Result<BTreeSet<Version>> {
        let dir = self.series_dir(series);
        let mut versions = BTreeSet::new();
        for (version, _) in Self::versioned_entries(&dir, METADATA_EXT)? {
            versions.insert(version);
        }
        for (version, _) in Self::versioned_entries(&dir, PAYLOAD_EXT)? {
            versions.insert(version);
        }
        Ok(versions)
    }

    /// Directory entries whose name is `<version><ext>`
    fn versioned_entries(dir: &Path, ext: &str) -> Result<Vec<(Version, PathBuf)>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let Some(stem) = name.strip_suffix(ext) else {
                continue;
            };
            if let Ok(version) = stem.parse::<Version>() {
                found.push((version, entry.path()));
            }
        }
        Ok(found)
    }

    fn read_metadata(path: &Path) -> std::result::Result<ArtifactMetadata, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        serde_json::from_slice(&bytes).map_err(|e| e.to_string())
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
                let dir = self.series_dir(series);
                let committed = dir.join(Self::metadata_name(version)).try_exists()?
                    && dir.join(Self::payload_name(version)).try_exists()?;
                Ok(committed)
            }
            None => Ok(!self.committed_versions(series)?.is_empty()),
        }
    }
}

impl ModelStorage for FilesystemStorage {
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

        let dir = self.series_dir(series);
        std::fs::create_dir_all(&dir)?;
        let swept = atomic::cleanup_temp_files(&dir)?;
        if swept > 0 {
            warn!(series = %series, swept, "removed stranded temporary files");
        }

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
        atomic::commit_bytes(&dir, &Self::payload_name(version), &payload)?;

        let metadata =
            ArtifactMetadata::new(series.clone(), version, model.model_type(), &payload);
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)?;
        atomic::commit_bytes(&dir, &Self::metadata_name(version), &metadata_bytes)?;

        info!(
            series = %series,
            version = %version,
            model_type = model.model_type(),
            "saved model artifact"
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

        let dir = self.series_dir(series);
        let metadata_bytes = match std::fs::read(dir.join(Self::metadata_name(version))) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::version_not_found(series.as_str(), version));
            }
            Err(e) => return Err(e.into()),
        };
        let metadata: ArtifactMetadata = serde_json::from_slice(&metadata_bytes)
            .map_err(|e| StoreError::corrupted(series.as_str(), version, e.to_string()))?;

        let payload = match std::fs::read(dir.join(Self::payload_name(version))) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Committed metadata without its payload: the commit order
                // makes this impossible short of external tampering.
                return Err(StoreError::corrupted(
                    series.as_str(),
                    version,
                    "payload file missing",
                ));
            }
            Err(e) => return Err(e.into()),
        };
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
            "loaded model artifact"
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
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut series = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let Ok(key) = SeriesKey::new(name.clone()) else {
                warn!(directory = %name, "skipping directory that is not a valid series key");
                continue;
            };
            // A series only counts once it has at least one committed
            // version; an empty or payload-only directory is not a series.
            if !self.committed_versions(&key)?.is_empty() {
                series.push(key);
            }
        }
        series.sort();
        Ok(series)
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
