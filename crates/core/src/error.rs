//! Error types for the model store
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Propagation policy: every error surfaces to the immediate caller; nothing
//! is retried inside the storage engine. `LockTimeout` and `VersionConflict`
//! are retryable by the caller; the rest are lookup failures, data problems,
//! or configuration mistakes.

use crate::version::Version;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for model store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error types for the model store
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error (file operations, object transfer, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Attempted to persist or use a model that was never fitted
    #[error("model has not been fitted")]
    UnfittedModel,

    /// Training failed (e.g. empty training series)
    #[error("fitting error: {0}")]
    Fitting(String),

    /// No artifact for the requested series, or the requested version is absent
    #[error("no model found for series '{series}'{}", version_suffix(.version))]
    NotFound {
        /// Series the lookup targeted
        series: String,
        /// Specific version requested, if any
        version: Option<Version>,
    },

    /// Artifact metadata is unreadable or the payload fails its checksum
    ///
    /// The corrupt files are left on disk for forensic inspection; they are
    /// excluded from version listings.
    #[error("corrupted artifact for series '{series}' version '{version}': {reason}")]
    Corrupted {
        /// Series owning the corrupt artifact
        series: String,
        /// Version of the corrupt artifact
        version: Version,
        /// What failed while reading it
        reason: String,
    },

    /// Lock acquisition exceeded the wait budget (caller-retryable)
    #[error("timed out after {waited:?} waiting for lock on series '{series}'")]
    LockTimeout {
        /// Series whose lock was contended
        series: String,
        /// How long the acquisition waited before giving up
        waited: Duration,
    },

    /// The target version was already committed (caller-retryable)
    ///
    /// Versions are immutable once written; a save that would land on an
    /// occupied version is refused instead of silently overwriting it.
    #[error("version '{version}' for series '{series}' is already committed")]
    VersionConflict {
        /// Series the save targeted
        series: String,
        /// Version that was already occupied
        version: Version,
    },

    /// Unknown model or storage backend tag (configuration error)
    #[error("unsupported {kind} type '{tag}'")]
    UnsupportedType {
        /// Which registry rejected the tag (`"model"` or `"storage"`)
        kind: &'static str,
        /// The unrecognized tag
        tag: String,
    },

    /// Series key failed validation
    #[error("invalid series key '{key}': {reason}")]
    InvalidSeriesKey {
        /// The rejected key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration file unreadable or malformed
    #[error("configuration error: {0}")]
    Config(String),
}

fn version_suffix(version: &Option<Version>) -> String {
    match version {
        Some(v) => format!(" at version '{}'", v),
        None => String::new(),
    }
}

impl StoreError {
    /// Lookup failure for a series with no committed versions
    pub fn not_found(series: impl Into<String>) -> Self {
        StoreError::NotFound {
            series: series.into(),
            version: None,
        }
    }

    /// Lookup failure for a specific absent version
    pub fn version_not_found(series: impl Into<String>, version: Version) -> Self {
        StoreError::NotFound {
            series: series.into(),
            version: Some(version),
        }
    }

    /// Corruption detected while reading an artifact
    pub fn corrupted(
        series: impl Into<String>,
        version: Version,
        reason: impl Into<String>,
    ) -> Self {
        StoreError::Corrupted {
            series: series.into(),
            version,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_io() {
        let err = StoreError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn display_not_found_without_version() {
        let err = StoreError::not_found("cpu-load");
        let msg = err.to_string();
        assert!(msg.contains("cpu-load"));
        assert!(!msg.contains("version"));
    }

    #[test]
    fn display_not_found_with_version() {
        let err = StoreError::version_not_found("cpu-load", Version::new(7));
        let msg = err.to_string();
        assert!(msg.contains("cpu-load"));
        assert!(msg.contains("v7"));
    }

    #[test]
    fn display_corrupted() {
        let err = StoreError::corrupted("s1", Version::INITIAL, "checksum mismatch");
        let msg = err.to_string();
        assert!(msg.contains("corrupted"));
        assert!(msg.contains("v0"));
        assert!(msg.contains("checksum mismatch"));
    }

    #[test]
    fn display_lock_timeout() {
        let err = StoreError::LockTimeout {
            series: "s1".to_string(),
            waited: Duration::from_secs(10),
        };
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("s1"));
    }

    #[test]
    fn display_unsupported_type() {
        let err = StoreError::UnsupportedType {
            kind: "model",
            tag: "neural".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported model type 'neural'");
    }

    #[test]
    fn from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn from_serde_json() {
        let result: std::result::Result<u64, serde_json::Error> =
            serde_json::from_str("not json");
        let err: StoreError = result.unwrap_err().into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn from_bincode() {
        let invalid = vec![0xFF; 2];
        let result: Result<String> = bincode::deserialize(&invalid).map_err(|e| e.into());
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn pattern_matching_on_fields() {
        let err = StoreError::VersionConflict {
            series: "s1".to_string(),
            version: Version::new(3),
        };
        match err {
            StoreError::VersionConflict { series, version } => {
                assert_eq!(series, "s1");
                assert_eq!(version, Version::new(3));
            }
            _ => panic!("wrong error variant"),
        }
    }
}
