//! Artifact version identifiers and allocation
//!
//! Versions are scoped to one series key, totally ordered, and rendered as
//! `v{n}` both on disk (file and object names) and in metadata. Readers that
//! need "latest" always take the maximum version, never the newest timestamp.
//!
//! Allocation policy: the first version of a series is [`Version::INITIAL`];
//! every later allocation is max(existing) + 1. Versions are never reused,
//! even when a later version turns out to be corrupt.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Monotonically increasing artifact version, scoped to one series key
///
/// The numeric value is an implementation detail; callers treat versions as
/// opaque ordered tokens. `Display`/`FromStr` use the `v{n}` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Version(u64);

impl Version {
    /// The version assigned to the first save of a series
    pub const INITIAL: Version = Version(0);

    /// Create a version from its numeric value
    pub fn new(n: u64) -> Self {
        Version(n)
    }

    /// Numeric value of this version
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// The version immediately after this one
    pub fn next(self) -> Version {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Error when parsing a version string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError {
    input: String,
}

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version string '{}'", self.input)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseVersionError {
            input: s.to_string(),
        };
        let digits = s.strip_prefix('v').ok_or_else(err)?;
        if digits.is_empty() {
            return Err(err());
        }
        let n: u64 = digits.parse().map_err(|_| err())?;
        Ok(Version(n))
    }
}

impl From<Version> for String {
    fn from(v: Version) -> String {
        v.to_string()
    }
}

impl TryFrom<String> for Version {
    type Error = ParseVersionError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Compute the next version for a series from its committed version set
///
/// Empty set means the series has never been written: the result is
/// [`Version::INITIAL`]. Otherwise the result is max(existing) + 1.
///
/// Must be called while the series lock is held; without the lock two
/// writers can observe the same set and break monotonicity.
pub fn next_version(existing: &BTreeSet<Version>) -> Version {
    match existing.iter().next_back() {
        Some(max) => max.next(),
        None => Version::INITIAL,
    }
}
