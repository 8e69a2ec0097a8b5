//! Artifact metadata persisted beside each payload
//!
//! The metadata document is the commit point of a save: a version exists
//! exactly when its metadata is fully committed. It records the type tag
//! that selects a deserializer at load time, so the (metadata, payload) pair
//! forms a tagged union whose payload bytes stay opaque to the storage layer.

use crate::series::SeriesKey;
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one committed artifact version
///
/// ## Fields
///
/// - `series_key` / `version`: identity of the artifact
/// - `model_type`: dispatch tag for the model factory at load time
/// - `created_at`: informational only; ordering always uses `version`
/// - `payload_crc32`: CRC32 of the payload bytes, verified on load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Series this artifact belongs to
    pub series_key: SeriesKey,
    /// Version of this artifact within the series
    pub version: Version,
    /// Tag selecting which model implementation can deserialize the payload
    pub model_type: String,
    /// When the artifact was committed (informational, never used for ordering)
    pub created_at: DateTime<Utc>,
    /// CRC32 checksum of the payload bytes
    pub payload_crc32: u32,
}

impl ArtifactMetadata {
    /// Build metadata for a payload about to be committed
    pub fn new(
        series_key: SeriesKey,
        version: Version,
        model_type: impl Into<String>,
        payload: &[u8],
    ) -> Self {
        ArtifactMetadata {
            series_key,
            version,
            model_type: model_type.into(),
            created_at: Utc::now(),
            payload_crc32: checksum(payload),
        }
    }

    /// Check the payload bytes against the recorded checksum
    pub fn verify_payload(&self, payload: &[u8]) -> bool {
        checksum(payload) == self.payload_crc32
    }
}

fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}
