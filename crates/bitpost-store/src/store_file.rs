//! Atomic file persistence shared by all stores.
//!
//! Values are bincode-serialized and written with the usual crash-safe
//! flow: write to a sibling temporary file, fsync, rename over the
//! target. If any step fails the previous file is untouched.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use bitpost_types::{BitpostError, Result};

/// Loads a value from `path`, or returns `T::default()` when the file
/// does not exist yet (first run).
pub fn load_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let raw = fs::read(path).map_err(|e| BitpostError::Storage {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    // An empty file is treated like a missing one.
    if raw.is_empty() {
        return Ok(T::default());
    }

    bincode::deserialize(&raw).map_err(|e| BitpostError::Storage {
        reason: format!("failed to deserialize {}: {e}", path.display()),
    })
}

/// Atomically saves a value to `path`.
///
/// Flow: serialize → write temp file → fsync → rename over target.
pub fn save<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    let encoded = bincode::serialize(value).map_err(|e| BitpostError::Storage {
        reason: format!("failed to serialize {}: {e}", path.display()),
    })?;

    let tmp_path = path.with_extension("tmp");

    let mut tmp = fs::File::create(&tmp_path).map_err(|e| BitpostError::Storage {
        reason: format!("failed to create {}: {e}", tmp_path.display()),
    })?;
    tmp.write_all(&encoded).map_err(|e| BitpostError::Storage {
        reason: format!("failed to write {}: {e}", tmp_path.display()),
    })?;
    tmp.sync_all().map_err(|e| BitpostError::Storage {
        reason: format!("failed to sync {}: {e}", tmp_path.display()),
    })?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|e| BitpostError::Storage {
        reason: format!(
            "failed to rename {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
