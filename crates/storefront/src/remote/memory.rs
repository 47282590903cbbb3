//! In-process document store.
//!
//! Backs tests and the CLI. Each user's collections publish full snapshots
//! through `tokio::sync::watch` channels, so watchers see the latest state
//! after every write. Failure injection (`set_offline`, `fail_next_commit`)
//! exercises the error paths of the sync engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use moscent_core::{
    CartKey, DocumentId, FavoriteSet, NewRemoteCartEntry, ProductId, RemoteCartEntry, UserId,
};

use super::{
    DocumentStore, RemoteError, SnapshotStream, WriteBatch, WriteOp, cart_path, favorites_path,
};

struct UserCollections {
    cart: Vec<RemoteCartEntry>,
    favorites: BTreeMap<ProductId, DateTime<Utc>>,
    cart_tx: watch::Sender<Vec<RemoteCartEntry>>,
    favorites_tx: watch::Sender<FavoriteSet>,
}

impl UserCollections {
    fn new() -> Self {
        let (cart_tx, _) = watch::channel(Vec::new());
        let (favorites_tx, _) = watch::channel(FavoriteSet::new());
        Self {
            cart: Vec::new(),
            favorites: BTreeMap::new(),
            cart_tx,
            favorites_tx,
        }
    }

    fn favorite_set(&self) -> FavoriteSet {
        self.favorites.keys().cloned().collect()
    }

    fn position(&self, key: &CartKey) -> Option<usize> {
        self.cart.iter().position(|entry| &entry.key() == key)
    }

    fn publish_cart(&self) {
        self.cart_tx.send_replace(self.cart.clone());
    }

    fn publish_favorites(&self) {
        self.favorites_tx.send_replace(self.favorite_set());
    }
}

/// Document store held in process memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    users: Mutex<HashMap<UserId, UserCollections>>,
    offline: AtomicBool,
    fail_next_commit: AtomicBool,
    commits: AtomicUsize,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read and write fail with [`RemoteError::Unavailable`].
    /// Live watchers keep their subscriptions.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject the next [`DocumentStore::commit`] with [`RemoteError::Aborted`].
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of batches committed successfully.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Seed a cart document directly, bypassing the composite-key check.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the store lock is poisoned.
    pub fn insert_cart_document(
        &self,
        uid: &UserId,
        entry: RemoteCartEntry,
    ) -> Result<(), RemoteError> {
        let mut users = self.lock()?;
        let collections = users
            .entry(uid.clone())
            .or_insert_with(UserCollections::new);
        collections.cart.push(entry);
        collections.publish_cart();
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, UserCollections>>, RemoteError> {
        self.users
            .lock()
            .map_err(|_| RemoteError::Unavailable("document store lock poisoned".to_string()))
    }

    fn ensure_online(&self, path: &str) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable(format!("{path}: backend offline")));
        }
        Ok(())
    }

    /// Run `f` against the user's collections, creating them if needed.
    fn with_user<R>(
        &self,
        uid: &UserId,
        f: impl FnOnce(&mut UserCollections) -> Result<R, RemoteError>,
    ) -> Result<R, RemoteError> {
        let mut users = self.lock()?;
        let collections = users
            .entry(uid.clone())
            .or_insert_with(UserCollections::new);
        f(collections)
    }
}

fn new_document_id() -> DocumentId {
    DocumentId::new(Uuid::new_v4().simple().to_string())
}

/// Stream a watch channel: current value first, then every change.
fn watch_stream<T>(rx: watch::Receiver<T>) -> SnapshotStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    futures::stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let snapshot = rx.borrow_and_update().clone();
        Some((Ok(snapshot), (rx, false)))
    })
    .boxed()
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn cart_snapshot(&self, uid: &UserId) -> Result<Vec<RemoteCartEntry>, RemoteError> {
        self.ensure_online(&cart_path(uid))?;
        self.with_user(uid, |c| Ok(c.cart.clone()))
    }

    async fn favorites_snapshot(&self, uid: &UserId) -> Result<FavoriteSet, RemoteError> {
        self.ensure_online(&favorites_path(uid))?;
        self.with_user(uid, |c| Ok(c.favorite_set()))
    }

    async fn find_cart_item(
        &self,
        uid: &UserId,
        key: &CartKey,
    ) -> Result<Option<RemoteCartEntry>, RemoteError> {
        self.ensure_online(&cart_path(uid))?;
        self.with_user(uid, |c| {
            Ok(c.position(key).and_then(|idx| c.cart.get(idx)).cloned())
        })
    }

    async fn increment_cart_item(
        &self,
        uid: &UserId,
        item: NewRemoteCartEntry,
    ) -> Result<RemoteCartEntry, RemoteError> {
        self.ensure_online(&cart_path(uid))?;
        self.with_user(uid, |c| {
            let key = item.key();
            let entry = if let Some(existing) = c.position(&key).and_then(|idx| c.cart.get_mut(idx))
            {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                existing.clone()
            } else {
                let entry = item.into_entry(new_document_id(), Utc::now());
                c.cart.push(entry.clone());
                entry
            };
            c.publish_cart();
            debug!(
                path = %cart_path(uid),
                key = %key,
                quantity = entry.quantity,
                "Cart item incremented"
            );
            Ok(entry)
        })
    }

    async fn set_cart_quantity(
        &self,
        uid: &UserId,
        id: &DocumentId,
        quantity: u32,
    ) -> Result<(), RemoteError> {
        self.ensure_online(&cart_path(uid))?;
        self.with_user(uid, |c| {
            let entry = c
                .cart
                .iter_mut()
                .find(|entry| &entry.id == id)
                .ok_or_else(|| RemoteError::NotFound(format!("{}/{id}", cart_path(uid))))?;
            entry.quantity = quantity;
            c.publish_cart();
            Ok(())
        })
    }

    async fn delete_cart_item(&self, uid: &UserId, id: &DocumentId) -> Result<(), RemoteError> {
        self.ensure_online(&cart_path(uid))?;
        self.with_user(uid, |c| {
            let before = c.cart.len();
            c.cart.retain(|entry| &entry.id != id);
            if c.cart.len() != before {
                c.publish_cart();
            }
            Ok(())
        })
    }

    async fn toggle_favorite(
        &self,
        uid: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, RemoteError> {
        self.ensure_online(&favorites_path(uid))?;
        self.with_user(uid, |c| {
            let now_favorite = if c.favorites.remove(product_id).is_some() {
                false
            } else {
                c.favorites.insert(product_id.clone(), Utc::now());
                true
            };
            c.publish_favorites();
            Ok(now_favorite)
        })
    }

    async fn commit(&self, uid: &UserId, batch: WriteBatch) -> Result<(), RemoteError> {
        self.ensure_online(&format!("users/{uid}"))?;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(RemoteError::Aborted("injected commit failure".to_string()));
        }

        self.with_user(uid, |c| {
            // Validate against a scratch copy so a rejected batch leaves no trace.
            let mut cart = c.cart.clone();
            let mut favorites = c.favorites.clone();
            let now = Utc::now();

            for op in batch.ops() {
                match op {
                    WriteOp::CreateCartItem(item) => {
                        let key = item.key();
                        if cart.iter().any(|entry| entry.key() == key) {
                            return Err(RemoteError::Aborted(format!(
                                "duplicate cart key {key} in {}",
                                cart_path(uid)
                            )));
                        }
                        cart.push(item.clone().into_entry(new_document_id(), now));
                    }
                    WriteOp::SetCartQuantity { id, quantity } => {
                        let entry = cart.iter_mut().find(|entry| &entry.id == id).ok_or_else(
                            || RemoteError::NotFound(format!("{}/{id}", cart_path(uid))),
                        )?;
                        entry.quantity = *quantity;
                    }
                    WriteOp::CreateFavorite(product_id) => {
                        favorites.entry(product_id.clone()).or_insert(now);
                    }
                }
            }

            let cart_changed = cart != c.cart;
            let favorites_changed = favorites != c.favorites;
            c.cart = cart;
            c.favorites = favorites;
            if cart_changed {
                c.publish_cart();
            }
            if favorites_changed {
                c.publish_favorites();
            }
            Ok(())
        })?;

        self.commits.fetch_add(1, Ordering::SeqCst);
        debug!(user_id = %uid, writes = batch.len(), "Batch committed");
        Ok(())
    }

    fn watch_cart(&self, uid: &UserId) -> SnapshotStream<Vec<RemoteCartEntry>> {
        match self.with_user(uid, |c| Ok(c.cart_tx.subscribe())) {
            Ok(rx) => watch_stream(rx),
            Err(e) => futures::stream::once(async move { Err(e) }).boxed(),
        }
    }

    fn watch_favorites(&self, uid: &UserId) -> SnapshotStream<FavoriteSet> {
        match self.with_user(uid, |c| Ok(c.favorites_tx.subscribe())) {
            Ok(rx) => watch_stream(rx),
            Err(e) => futures::stream::once(async move { Err(e) }).boxed(),
        }
    }
}
