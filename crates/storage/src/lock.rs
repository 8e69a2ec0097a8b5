//! Per-series lock manager
//!
//! One mutex per distinct series key, created lazily on first use. Lock
//! creation goes through the sharded registry so it cannot race; lock *use*
//! never touches a global. Acquisition blocks up to the configured timeout
//! and fails with `LockTimeout` instead of waiting indefinitely; a timed-out
//! acquisition leaves no residual state and the lock is immediately
//! available to the next caller.
//!
//! Locks are held for the duration of a single storage operation via an RAII
//! guard, never across operations, and never shared between keys.

use dashmap::DashMap;
use modelvault_core::{Result, SeriesKey, StoreError};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::sync::Arc;
use std::time::Duration;

/// Default wait budget for lock acquisition
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// RAII guard for a held series lock
///
/// Dropping the guard releases the lock.
pub type SeriesGuard = ArcMutexGuard<RawMutex, ()>;

/// Registry of per-series mutexes with bounded-wait acquisition
#[derive(Debug)]
pub struct SeriesLockManager {
    locks: DashMap<SeriesKey, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl SeriesLockManager {
    /// Create a lock manager with the given acquisition timeout
    pub fn new(timeout: Duration) -> Self {
        SeriesLockManager {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// The configured wait budget
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquire the exclusive lock for a series, waiting up to the timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockTimeout`] if the lock could not be acquired
    /// within the wait budget. The error is retryable; no lock state is left
    /// behind.
    pub fn acquire(&self, series: &SeriesKey) -> Result<SeriesGuard> {
        // The registry shard guard must drop before blocking on the series
        // mutex, or a contended key would stall unrelated keys on the same
        // shard.
        let lock = {
            let entry = self.locks.entry(series.clone()).or_default();
            Arc::clone(entry.value())
        };

        lock.try_lock_arc_for(self.timeout)
            .ok_or_else(|| StoreError::LockTimeout {
                series: series.to_string(),
                waited: self.timeout,
            })
    }

    /// Number of series that have ever been locked
    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

impl Default for SeriesLockManager {
    fn default() -> Self {
        SeriesLockManager::new(DEFAULT_LOCK_TIMEOUT)
    }
}
