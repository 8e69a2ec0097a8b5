//! Core trait seams: trainable models and storage backends
//!
//! These traits let the active model algorithm and the persistence backend be
//! chosen by configuration without breaking the layers above. Both are object
//! safe; factories hand out boxed trait objects keyed by string tags.

use crate::error::Result;
use crate::series::{DataPoint, SeriesKey, TimeSeries};
use crate::version::Version;

/// A trainable anomaly-detection model
///
/// Implementations own their fitted state. A freshly constructed model is
/// unfitted; `fit` or `from_bytes` moves it to the fitted state. The storage
/// layer never inspects the payload bytes beyond pairing them with the
/// `model_type` tag.
pub trait AnomalyModel: Send + std::fmt::Debug {
    /// Train the model on historical data
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Fitting`](crate::StoreError::Fitting) if the
    /// series cannot be trained on (e.g. it is empty).
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Decide whether a point is anomalous
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnfittedModel`](crate::StoreError::UnfittedModel)
    /// if called before a successful fit.
    fn predict(&self, point: &DataPoint) -> Result<bool>;

    /// Serialize the fitted state to an opaque payload
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnfittedModel`](crate::StoreError::UnfittedModel)
    /// if called before a successful fit.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Restore fitted state from a payload produced by `to_bytes`
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the payload does not match this
    /// model's format.
    fn from_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// True once the model has been fitted or hydrated
    fn is_fitted(&self) -> bool;

    /// Type tag used for factory dispatch and persisted in metadata
    fn model_type(&self) -> &'static str;
}

/// Versioned persistence for model artifacts
///
/// Uniform contract over interchangeable backends (local filesystem, remote
/// object store). All mutating operations and all latest-resolving reads on
/// the same series are serialized by a per-series lock with a bounded wait;
/// operations on different series never block each other.
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait ModelStorage: Send + Sync + std::fmt::Debug {
    /// Persist a fitted model, returning the version it was committed under
    ///
    /// With `version == None` the next version is allocated under the series
    /// lock (strictly greater than every committed version). An explicit
    /// version targeting an already-committed version is refused.
    ///
    /// # Errors
    ///
    /// - [`UnfittedModel`](crate::StoreError::UnfittedModel) if the model
    ///   reports it was never fitted (the version set is left unchanged)
    /// - [`VersionConflict`](crate::StoreError::VersionConflict) if the
    ///   explicit version is already committed
    /// - [`LockTimeout`](crate::StoreError::LockTimeout) under contention
    fn save(
        &self,
        series: &SeriesKey,
        model: &dyn AnomalyModel,
        version: Option<Version>,
    ) -> Result<Version>;

    /// Load a model, resolving `None` to the latest committed version
    ///
    /// Returns the hydrated model together with the version it was read from.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::StoreError::NotFound) if the series has no
    ///   committed versions or the explicit version is absent
    /// - [`Corrupted`](crate::StoreError::Corrupted) if metadata is
    ///   unreadable or the payload fails its checksum
    /// - [`UnsupportedType`](crate::StoreError::UnsupportedType) if the
    ///   artifact's type tag has no registered model implementation
    fn load(
        &self,
        series: &SeriesKey,
        version: Option<Version>,
    ) -> Result<(Box<dyn AnomalyModel>, Version)>;

    /// Highest committed version of the series, or `None` if it has none
    fn latest_version(&self, series: &SeriesKey) -> Result<Option<Version>>;

    /// All committed versions of the series, ascending
    ///
    /// Reflects only fully committed versions: entries mid-write or with
    /// unparseable metadata are excluded.
    fn list_versions(&self, series: &SeriesKey) -> Result<Vec<Version>>;

    /// All series with at least one committed version, ascending by key
    fn list_series(&self) -> Result<Vec<SeriesKey>>;

    /// Whether the series (or a specific version of it) is committed
    ///
    /// Never fails: I/O errors are reported as `false`. The swallowed error
    /// is logged, but callers that must distinguish an outage from absence
    /// should use [`list_versions`](ModelStorage::list_versions) instead.
    fn exists(&self, series: &SeriesKey, version: Option<Version>) -> bool;
}
