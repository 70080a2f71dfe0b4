//! Small persisted engine state.
//!
//! Currently just the timestamp of the last database cleaning run,
//! which gates how often the cleaning routine fires. Kept in its own
//! file so maintenance bookkeeping never contends with queue writes.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use bitpost_types::{BitpostError, Result};

use crate::store_file;

/// On-disk settings contents.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    /// Unix seconds of the last database cleaning run; 0 = never.
    last_database_clean_time: u64,
}

/// Thread-safe settings store with file persistence.
pub struct SettingsStore {
    inner: Mutex<SettingsFile>,
    file_path: PathBuf,
}

impl SettingsStore {
    /// Opens or creates a settings store backed by a file.
    pub fn open(path: &Path) -> Result<Self> {
        let contents: SettingsFile = store_file::load_or_default(path)?;
        Ok(Self {
            inner: Mutex::new(contents),
            file_path: path.to_path_buf(),
        })
    }

    /// Returns the last database clean time (0 = never run).
    pub fn last_database_clean_time(&self) -> Result<u64> {
        let inner = self.lock()?;
        Ok(inner.last_database_clean_time)
    }

    /// Records a database cleaning run at `now`.
    pub fn set_last_database_clean_time(&self, now: u64) -> Result<()> {
        let mut inner = self.lock()?;
        inner.last_database_clean_time = now;
        self.persist(&inner)
    }

    // -- Internal ---------------------------------------------------------

    fn lock(&self) -> Result<MutexGuard<'_, SettingsFile>> {
        self.inner.lock().map_err(|e| BitpostError::Storage {
            reason: format!("settings store lock poisoned: {e}"),
        })
    }

    fn persist(&self, inner: &SettingsFile) -> Result<()> {
        store_file::save(&self.file_path, inner)
    }
}
