//! In-memory cart and favorites state shared with the UI layer.

use std::sync::Arc;

use tokio::sync::watch;

use moscent_core::{CartLine, CartSummary, FavoriteSet, LocalCartEntry, StorageTarget, UserId};

/// A consistent view of everything the UI renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSnapshot {
    /// True until the first auth callback has been handled. Cart and
    /// favorites must not be read while this is set.
    pub loading: bool,
    /// Store that currently backs the collections below.
    pub target: StorageTarget,
    pub cart: Vec<CartLine>,
    pub favorites: FavoriteSet,
    /// Full local entries behind `cart` while the target is local.
    local_cart: Vec<LocalCartEntry>,
}

impl Default for ShopSnapshot {
    fn default() -> Self {
        Self {
            loading: true,
            target: StorageTarget::Local,
            cart: Vec::new(),
            favorites: FavoriteSet::new(),
            local_cart: Vec::new(),
        }
    }
}

impl ShopSnapshot {
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::from_lines(&self.cart)
    }
}

/// Application state shared between the observer, listeners, mutators and
/// any number of readers.
///
/// This struct is cheaply cloneable via `Arc`. Every update publishes a new
/// [`ShopSnapshot`]; collections are always replaced whole, never patched.
#[derive(Clone, Debug)]
pub struct ShopState {
    inner: Arc<watch::Sender<ShopSnapshot>>,
}

impl ShopState {
    /// Create state in the loading phase.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ShopSnapshot::default());
        Self {
            inner: Arc::new(tx),
        }
    }

    /// Receive every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ShopSnapshot> {
        self.inner.subscribe()
    }

    /// The latest snapshot, including while loading.
    #[must_use]
    pub fn snapshot(&self) -> ShopSnapshot {
        self.inner.borrow().clone()
    }

    /// The latest snapshot, or `None` while loading.
    #[must_use]
    pub fn ready_snapshot(&self) -> Option<ShopSnapshot> {
        let snapshot = self.inner.borrow();
        (!snapshot.loading).then(|| snapshot.clone())
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.borrow().loading
    }

    /// Wait until the first auth callback has been handled.
    pub async fn wait_ready(&self) -> ShopSnapshot {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let ready = rx.wait_for(|snapshot| !snapshot.loading).await;
        ready.map_or_else(|_| self.snapshot(), |snapshot| snapshot.clone())
    }

    /// The in-memory local cart entries.
    ///
    /// Empty unless the target is local. Local mutations start from this
    /// rather than from storage, so a failed write does not lose earlier
    /// changes.
    #[must_use]
    pub fn local_cart(&self) -> Vec<LocalCartEntry> {
        self.inner.borrow().local_cart.clone()
    }

    #[must_use]
    pub fn favorites(&self) -> FavoriteSet {
        self.inner.borrow().favorites.clone()
    }

    /// Replace the local cart with a full snapshot.
    pub fn replace_local_cart(&self, cart: Vec<LocalCartEntry>) {
        let lines = cart.iter().map(CartLine::from).collect();
        self.inner.send_modify(|snapshot| {
            snapshot.cart = lines;
            snapshot.local_cart = cart;
        });
    }

    /// Replace the favorites with a full snapshot.
    pub fn replace_favorites(&self, favorites: FavoriteSet) {
        self.inner.send_modify(|snapshot| snapshot.favorites = favorites);
    }

    /// Replace the cart with a listener emission for `uid`.
    ///
    /// Ignored unless `uid` is still the active remote target, so an emission
    /// racing a sign-out cannot overwrite local state. Returns whether the
    /// snapshot was applied.
    pub fn replace_remote_cart(&self, uid: &UserId, cart: Vec<CartLine>) -> bool {
        self.inner.send_if_modified(|snapshot| {
            if snapshot.target.user_id() != Some(uid) {
                return false;
            }
            snapshot.cart = cart;
            true
        })
    }

    /// Replace the favorites with a listener emission for `uid`.
    ///
    /// Same target check as [`Self::replace_remote_cart`].
    pub fn replace_remote_favorites(&self, uid: &UserId, favorites: FavoriteSet) -> bool {
        self.inner.send_if_modified(|snapshot| {
            if snapshot.target.user_id() != Some(uid) {
                return false;
            }
            snapshot.favorites = favorites;
            true
        })
    }

    /// Show local storage contents as the active state.
    pub fn show_local(&self, cart: Vec<LocalCartEntry>, favorites: FavoriteSet) {
        let lines = cart.iter().map(CartLine::from).collect();
        self.inner.send_modify(|snapshot| {
            snapshot.loading = false;
            snapshot.target = StorageTarget::Local;
            snapshot.cart = lines;
            snapshot.favorites = favorites;
            snapshot.local_cart = cart;
        });
    }

    /// Switch to a remote target; collections are cleared until the first
    /// listener emission arrives.
    pub fn show_remote(&self, target: StorageTarget) {
        self.inner.send_modify(|snapshot| {
            snapshot.loading = false;
            snapshot.target = target;
            snapshot.cart = Vec::new();
            snapshot.favorites = FavoriteSet::new();
            snapshot.local_cart = Vec::new();
        });
    }
}

impl Default for ShopState {
    fn default() -> Self {
        Self::new()
    }
}
