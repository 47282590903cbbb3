//! Per-user collections in the hosted document database.
//!
//! # Collections
//!
//! - `users/{uid}/cart/{autoId}` - one [`RemoteCartEntry`] per composite key
//! - `users/{uid}/favorites/{productId}` - presence means favorited
//!
//! The database does not enforce composite-key uniqueness; every write path
//! in this crate preserves it. Single-document mutations that depend on
//! existing state (`increment_cart_item`, `toggle_favorite`) are atomic on the
//! backend so concurrent callers cannot create duplicates. Multi-document
//! writes go through [`WriteBatch`] and [`DocumentStore::commit`], which is
//! all-or-nothing.

mod memory;

pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use moscent_core::{
    CartKey, DocumentId, FavoriteSet, NewRemoteCartEntry, ProductId, RemoteCartEntry, UserId,
};

/// Errors that can occur when talking to the document database.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The backend could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Security rules rejected the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A referenced document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An atomic batch was rejected; none of its writes were applied.
    #[error("batch aborted: {0}")]
    Aborted(String),

    /// A document could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Stream of full collection snapshots.
///
/// Emits the current snapshot on subscription and again after every change.
pub type SnapshotStream<T> = BoxStream<'static, Result<T, RemoteError>>;

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Create a cart document; the backend stamps `id` and `addedAt`.
    CreateCartItem(NewRemoteCartEntry),
    /// Overwrite the quantity of an existing cart document, keeping `addedAt`.
    SetCartQuantity { id: DocumentId, quantity: u32 },
    /// Create `favorites/{productId}` stamped with `addedAt`.
    CreateFavorite(ProductId),
}

/// An ordered set of writes applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl FromIterator<WriteOp> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = WriteOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

/// Access to a user's cart and favorites collections.
///
/// Every method is a network round-trip on a real backend and suspends the
/// caller until it completes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One-shot read of the whole cart collection.
    async fn cart_snapshot(&self, uid: &UserId) -> Result<Vec<RemoteCartEntry>, RemoteError>;

    /// One-shot read of the favorite product ids.
    async fn favorites_snapshot(&self, uid: &UserId) -> Result<FavoriteSet, RemoteError>;

    /// Find the cart document for a composite key (query on `productId` and
    /// `selectedSize`).
    async fn find_cart_item(
        &self,
        uid: &UserId,
        key: &CartKey,
    ) -> Result<Option<RemoteCartEntry>, RemoteError>;

    /// Atomically add `item.quantity` to the document with the same composite
    /// key, or create it if absent. Returns the resulting document.
    async fn increment_cart_item(
        &self,
        uid: &UserId,
        item: NewRemoteCartEntry,
    ) -> Result<RemoteCartEntry, RemoteError>;

    /// Overwrite the quantity of an existing cart document.
    async fn set_cart_quantity(
        &self,
        uid: &UserId,
        id: &DocumentId,
        quantity: u32,
    ) -> Result<(), RemoteError>;

    /// Delete a cart document. Deleting a missing document is not an error.
    async fn delete_cart_item(&self, uid: &UserId, id: &DocumentId) -> Result<(), RemoteError>;

    /// Atomically create or delete `favorites/{productId}`; returns whether
    /// the product is a favorite afterwards.
    async fn toggle_favorite(&self, uid: &UserId, product_id: &ProductId)
    -> Result<bool, RemoteError>;

    /// Apply every write in `batch` or none of them.
    async fn commit(&self, uid: &UserId, batch: WriteBatch) -> Result<(), RemoteError>;

    /// Live snapshots of the cart collection.
    fn watch_cart(&self, uid: &UserId) -> SnapshotStream<Vec<RemoteCartEntry>>;

    /// Live snapshots of the favorites collection.
    fn watch_favorites(&self, uid: &UserId) -> SnapshotStream<FavoriteSet>;
}

/// Document path of a user's cart collection, used in logs.
#[must_use]
pub fn cart_path(uid: &UserId) -> String {
    format!("users/{uid}/cart")
}

/// Document path of a user's favorites collection, used in logs.
#[must_use]
pub fn favorites_path(uid: &UserId) -> String {
    format!("users/{uid}/favorites")
}
