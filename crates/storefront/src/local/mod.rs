//! Device-local persistence for anonymous shoppers.
//!
//! # Keys
//!
//! - `moScentCart` - JSON array of [`LocalCartEntry`]
//! - `moScentFavourites` - JSON array of product id strings
//!
//! Every write replaces the whole collection (read-modify-write); there are no
//! field-level updates. Reads never fail from the caller's point of view: a
//! missing, unreadable or corrupt value is logged and treated as empty.

mod file;
mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use moscent_core::{FavoriteSet, LocalCartEntry, coalesce_local};

/// Local storage key holding the cart.
pub const CART_KEY: &str = "moScentCart";

/// Local storage key holding favorite product ids.
pub const FAVORITES_KEY: &str = "moScentFavourites";

/// Errors raised by a local key-value backend.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// Reading or writing the backing medium failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused the write because it is full.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// A lock guarding the backend was poisoned by a panicking writer.
    #[error("local store lock poisoned")]
    Poisoned,
}

/// A synchronous string key-value store, the analogue of browser local storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}

/// Typed access to the cart and favorites keys of a [`KeyValueStore`].
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KeyValueStore>,
}

impl LocalStore {
    /// Wrap a key-value backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// A store backed by process memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    /// Load the cart, falling back to an empty cart on any error.
    ///
    /// Duplicate composite keys in stored data are folded together.
    #[must_use]
    pub fn load_cart(&self) -> Vec<LocalCartEntry> {
        self.read_json::<Vec<LocalCartEntry>>(CART_KEY)
            .map(coalesce_local)
            .unwrap_or_default()
    }

    /// Persist the whole cart.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if encoding or writing fails.
    pub fn save_cart(&self, cart: &[LocalCartEntry]) -> Result<(), LocalStoreError> {
        self.write_json(CART_KEY, &cart)
    }

    /// Load favorites, falling back to an empty set on any error.
    #[must_use]
    pub fn load_favorites(&self) -> FavoriteSet {
        self.read_json::<FavoriteSet>(FAVORITES_KEY)
            .unwrap_or_default()
    }

    /// Persist the whole favorites set.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if encoding or writing fails.
    pub fn save_favorites(&self, favorites: &FavoriteSet) -> Result<(), LocalStoreError> {
        self.write_json(FAVORITES_KEY, favorites)
    }

    /// Delete the cart key.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend cannot be written.
    pub fn clear_cart(&self) -> Result<(), LocalStoreError> {
        self.backend.remove(CART_KEY)
    }

    /// Delete the favorites key.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend cannot be written.
    pub fn clear_favorites(&self) -> Result<(), LocalStoreError> {
        self.backend.remove(FAVORITES_KEY)
    }

    /// Raw value under `key`, for inspection in tests and tooling.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend cannot be read.
    pub fn raw(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        self.backend.get(key)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read local store, using empty collection");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Corrupt local store value, using empty collection");
                None
            }
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), LocalStoreError> {
        let encoded = serde_json::to_string(value)?;
        self.backend.set(key, &encoded)?;
        debug!(key, bytes = encoded.len(), "Local store written");
        Ok(())
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}
