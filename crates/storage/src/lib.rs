//! Storage engine for Modelvault
//!
//! Combines the per-series lock manager, the crash-safe atomic writer, and
//! version allocation into two interchangeable
//! [`ModelStorage`](modelvault_core::ModelStorage) backends:
//!
//! - [`FilesystemStorage`]: one directory per series on local disk, each
//!   version committed via write-fsync-rename
//! - [`ObjectStoreStorage`]: the same layout as object keys, committed via
//!   conditional whole-object puts
//!
//! Save data flow: acquire the series lock → allocate the next version →
//! serialize the model → atomically commit payload then metadata → release
//! the lock and return the version. Loads follow the same locking
//! discipline but only read.

pub mod atomic;
pub mod factory;
pub mod filesystem;
pub mod lock;
pub mod object_store;

pub use factory::{StorageFactory, StorageSettings};
pub use filesystem::{FilesystemSettings, FilesystemStorage};
pub use lock::{SeriesGuard, SeriesLockManager, DEFAULT_LOCK_TIMEOUT};
pub use object_store::{
    InMemoryObjectClient, ObjectClient, ObjectStoreSettings, ObjectStoreStorage,
};
