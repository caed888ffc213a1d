//! Desktop storage
//!
//! Key-value pairs persisted as a JSON object in a single file at:
//! - Linux: ~/.config/partysheet/storage.json
//! - macOS: ~/Library/Application Support/app.partysheet.partysheet/storage.json
//! - Windows: C:\Users\<User>\AppData\Roaming\partysheet\partysheet\config\storage.json

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use directories::ProjectDirs;

use crate::ports::outbound::StorageProvider;

#[derive(Debug, Clone)]
pub struct DesktopStorageProvider {
    storage_path: PathBuf,
    /// In-memory copy of the file; reads never touch the disk.
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl Default for DesktopStorageProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopStorageProvider {
    /// Storage in the user's config directory.
    pub fn new() -> Self {
        let storage_path = match ProjectDirs::from("app", "partysheet", "partysheet") {
            Some(dirs) => dirs.config_dir().join("storage.json"),
            None => PathBuf::from("partysheet_storage.json"),
        };
        Self::at(storage_path)
    }

    /// Storage backed by an explicit file, loading it if it exists.
    pub fn at(storage_path: impl Into<PathBuf>) -> Self {
        let storage_path = storage_path.into();
        let cache = read_file(&storage_path);
        tracing::debug!(path = ?storage_path, entries = cache.len(), "Desktop storage initialized");

        Self {
            storage_path,
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    fn persist(&self) {
        if let Some(parent) = self.storage_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::error!(error = %e, "Failed to create storage directory");
                return;
            }
        }

        let data = match self.cache.read() {
            Ok(cache) => serde_json::to_string_pretty(&*cache),
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire read lock for storage");
                return;
            }
        };

        match data {
            Ok(data) => {
                if let Err(e) = fs::write(&self.storage_path, data) {
                    tracing::error!(error = %e, "Failed to write storage file");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize storage data"),
        }
    }
}

fn read_file(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        return HashMap::new();
    }
    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to parse storage file");
            HashMap::new()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read storage file");
            HashMap::new()
        }
    }
}

impl StorageProvider for DesktopStorageProvider {
    fn save(&self, key: &str, value: &str) {
        match self.cache.write() {
            Ok(mut guard) => {
                guard.insert(key.to_string(), value.to_string());
                drop(guard); // Release lock before I/O
                self.persist();
            }
            Err(e) => tracing::error!(error = %e, "Failed to acquire write lock for storage"),
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.cache.read() {
            Ok(guard) => guard.get(key).cloned(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire read lock for storage");
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        match self.cache.write() {
            Ok(mut guard) => {
                guard.remove(key);
                drop(guard); // Release lock before I/O
                self.persist();
            }
            Err(e) => tracing::error!(error = %e, "Failed to acquire write lock for storage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("storage.json");

        let storage = DesktopStorageProvider::at(&path);
        storage.save("pinned-character", "\"olympia\"");
        storage.save("other", "1");
        storage.remove("other");

        let reopened = DesktopStorageProvider::at(&path);
        assert_eq!(
            reopened.load("pinned-character").as_deref(),
            Some("\"olympia\"")
        );
        assert_eq!(reopened.load("other"), None);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").expect("write");

        let storage = DesktopStorageProvider::at(&path);
        assert_eq!(storage.load("pinned-character"), None);
    }
}
