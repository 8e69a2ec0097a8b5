//! Crash-safe artifact writer
//!
//! Uses the write-fsync-rename pattern for atomic file creation:
//!
//! 1. Write to a dot-prefixed temporary file in the target directory
//!    (same volume, so the rename cannot cross filesystems)
//! 2. fsync the temporary file
//! 3. Atomic rename to the final name — the sole commit point
//! 4. fsync the parent directory
//!
//! A crash at any step before the rename leaves the target untouched;
//! readers never observe a partial file. Stranded temporaries from crashed
//! writers are swept by [`cleanup_temp_files`] the next time the directory
//! is opened for writing.

use modelvault_core::Result;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Suffix of in-flight temporary files
const TEMP_SUFFIX: &str = ".tmp";

fn temp_path(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(format!(".{}{}", file_name, TEMP_SUFFIX))
}

/// Atomically commit `bytes` to `dir/file_name`
///
/// On success the target contains exactly `bytes` and no temporary remains.
/// On failure the temporary is removed and the previous target state (absent
/// or a fully committed older file) is untouched.
///
/// Callers serialize writers per directory (the series lock), so the
/// temporary name can be deterministic; a stale temporary with the same name
/// is removed before writing.
pub fn commit_bytes(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = dir.join(file_name);
    let temp = temp_path(dir, file_name);

    match std::fs::remove_file(&temp) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let result = write_and_rename(&temp, &target, dir, bytes);
    if result.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    result?;
    Ok(target)
}

fn write_and_rename(temp: &Path, target: &Path, dir: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().create_new(true).write(true).open(temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(temp, target)?;

    let dir_handle = File::open(dir)?;
    dir_handle.sync_all()?;
    Ok(())
}

/// Remove stranded temporary files from a directory
///
/// Returns the number of files removed. A missing directory counts as clean.
pub fn cleanup_temp_files(dir: &Path) -> Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut count = 0;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
            std::fs::remove_file(entry.path())?;
            count += 1;
        }
    }
    Ok(count)
}
