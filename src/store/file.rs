// SPDX-License-Identifier: MIT

//! File-backed key-value store: one JSON document per key.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::store::KvStore;

/// Key-value store persisting each key as `<base_dir>/<key>.json`.
///
/// Writes go through a temp file followed by a rename so a crash mid-write
/// never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    base_dir: PathBuf,
}

impl FileKvStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .map_err(|e| AppError::Storage(format!("create {}: {}", base_dir.display(), e)))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| AppError::Storage(format!("read {}: {}", path.display(), e)))?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, value)
            .map_err(|e| AppError::Storage(format!("write {}: {}", temp_path.display(), e)))?;
        fs::rename(&temp_path, &path)
            .map_err(|e| AppError::Storage(format!("rename {}: {}", path.display(), e)))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
