//! # File-Backed Settings Store
//!
//! Writes go to `<name>.tmp`, are synced, then renamed over the document.
//! Readers and writers serialize on an `fs2` lock held on `<name>.lock`, so
//! concurrent processes never interleave a read with a rename.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::StoreError;
use crate::ports::outbound::SettingsFile;

pub struct AtomicSettingsFile {
    name: String,
    path: PathBuf,
    lock_path: PathBuf,
    temp_path: PathBuf,
}

impl AtomicSettingsFile {
    /// A store named `file_name` inside `data_dir`.
    pub fn new(data_dir: &Path, file_name: &str) -> Self {
        let path = data_dir.join(file_name);
        Self {
            name: file_name.to_string(),
            lock_path: path.with_extension("lock"),
            temp_path: path.with_extension("tmp"),
            path,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: &io::Error) -> StoreError {
        StoreError::Io {
            store: self.name.clone(),
            message: e.to_string(),
        }
    }

    fn open_lock(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(&e))?;
        }
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| self.io_error(&e))
    }
}

impl SettingsFile for AtomicSettingsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read(&self) -> Result<Vec<u8>, StoreError> {
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)
            .map_err(|_| StoreError::Locked(self.name.clone()))?;
        let result = fs::read(&self.path).map_err(|e| self.io_error(&e));
        let _ = FileExt::unlock(&lock);
        result
    }

    fn atomic_write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock)
            .map_err(|_| StoreError::Locked(self.name.clone()))?;

        let result = (|| {
            let mut file = File::create(&self.temp_path).map_err(|e| self.io_error(&e))?;
            file.write_all(bytes).map_err(|e| self.io_error(&e))?;
            file.sync_all().map_err(|e| self.io_error(&e))?;
            fs::rename(&self.temp_path, &self.path).map_err(|e| self.io_error(&e))
        })();

        if result.is_err() {
            let _ = fs::remove_file(&self.temp_path);
        }
        let _ = FileExt::unlock(&lock);
        debug!(store = %self.name, bytes = bytes.len(), ok = result.is_ok(), "Settings written");
        result
    }
}
