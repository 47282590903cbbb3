//! File-backed key-value backend.
//!
//! The whole store is one JSON object on disk (`{"moScentCart": "[...]", ...}`),
//! rewritten atomically on every change via a temp file and rename.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use super::{KeyValueStore, LocalStoreError};

/// Key-value store persisted as a JSON file.
///
/// A missing file reads as an empty store. The parent directory is created on
/// first write.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, LocalStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), LocalStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let _guard = self.lock.lock().map_err(|_| LocalStoreError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        let _guard = self.lock.lock().map_err(|_| LocalStoreError::Poisoned)?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        let _guard = self.lock.lock().map_err(|_| LocalStoreError::Poisoned)?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("absent.json"));
        assert!(store.get("moScentCart").unwrap().is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        FileKeyValueStore::new(&path).set("k", "[1,2]").unwrap();
        let reopened = FileKeyValueStore::new(&path);
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("[1,2]"));

        reopened.remove("k").unwrap();
        assert!(FileKeyValueStore::new(&path).get("k").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileKeyValueStore::new(&path);
        assert!(matches!(
            store.get("k"),
            Err(LocalStoreError::Serialization(_))
        ));
    }
}
