//! Series keys and time-series sample types
//!
//! A series key is the logical identifier under which all versions of one
//! model artifact live. Keys become filesystem directory names and object-key
//! segments, so they are validated at construction:
//!
//! - 1-128 characters
//! - only alphanumeric, dash, underscore, dot
//! - must not start with a dash or dot (keeps series directories clear of
//!   temp-file and hidden-entry namespaces, and rules out path traversal)

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a series key
pub const MAX_SERIES_KEY_LENGTH: usize = 128;

/// Validated identifier for one artifact family
///
/// ## Examples
///
/// Valid keys: `"cpu-load"`, `"sensor_42"`, `"billing.daily"`.
/// Invalid keys: `""`, `".hidden"`, `"-flag"`, `"has spaces"`, `"a/b"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey(String);

impl SeriesKey {
    /// Create a new series key, validating the input
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSeriesKey`] if the key is empty, too
    /// long, contains a character outside `[A-Za-z0-9_.-]`, or starts with
    /// `.` or `-`.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        Self::validate(&key).map_err(|reason| StoreError::InvalidSeriesKey {
            key: key.clone(),
            reason,
        })?;
        Ok(SeriesKey(key))
    }

    fn validate(key: &str) -> std::result::Result<(), String> {
        if key.is_empty() {
            return Err("key cannot be empty".to_string());
        }
        if key.len() > MAX_SERIES_KEY_LENGTH {
            return Err(format!(
                "key too long: {} chars (max {})",
                key.len(),
                MAX_SERIES_KEY_LENGTH
            ));
        }
        // is_empty checked above
        if let Some(first) = key.chars().next() {
            if first == '.' || first == '-' {
                return Err(format!("key cannot start with '{}'", first));
            }
        }
        for (position, ch) in key.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.') {
                return Err(format!(
                    "invalid character '{}' at position {} (only alphanumeric, dash, underscore, dot allowed)",
                    ch, position
                ));
            }
        }
        Ok(())
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the underlying string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SeriesKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SeriesKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        SeriesKey::new(s)
    }
}

/// A single observation in a time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Unix timestamp of the observation
    pub timestamp: i64,
    /// Observed value
    pub value: f64,
}

impl DataPoint {
    /// Create a data point
    pub fn new(timestamp: i64, value: f64) -> Self {
        DataPoint { timestamp, value }
    }
}

/// A time-ordered sequence of observations used as training input
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Observations, ordered by time
    pub data: Vec<DataPoint>,
}

impl TimeSeries {
    /// Create a time series from observations
    pub fn new(data: Vec<DataPoint>) -> Self {
        TimeSeries { data }
    }

    /// Build a series from bare values, assigning sequential timestamps
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let data = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| DataPoint::new(i as i64, value))
            .collect();
        TimeSeries { data }
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the series holds no observations
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterator over the observed values
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().map(|p| p.value)
    }
}
