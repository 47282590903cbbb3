//! In-memory key-value backend.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{KeyValueStore, LocalStoreError};

/// Key-value store held in process memory.
///
/// An optional byte quota mimics the size limit of browser storage: a write
/// that would push the total of keys plus values over the quota fails with
/// [`LocalStoreError::QuotaExceeded`] and leaves the store unchanged.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes beyond `bytes` in total.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let entries = self.entries.lock().map_err(|_| LocalStoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        let mut entries = self.entries.lock().map_err(|_| LocalStoreError::Poisoned)?;

        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(LocalStoreError::QuotaExceeded);
            }
        }

        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        let mut entries = self.entries.lock().map_err(|_| LocalStoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
