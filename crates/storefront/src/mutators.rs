//! Cart and favorites mutators.
//!
//! Every mutator dispatches on the authoritative storage target, holding a
//! read lock on it for the duration of the write so a login merge cannot
//! interleave. Failures are reported and swallowed; callers observe the
//! outcome through [`crate::state::ShopState`].
//!
//! On the remote path nothing is applied optimistically: the next listener
//! emission carries the result. On the local path the change is applied to
//! the in-memory collection, which is then written whole and published.

use tokio::sync::RwLockReadGuard;
use tracing::{debug, instrument};

use moscent_core::{
    CartKey, LocalCartEntry, NewRemoteCartEntry, Product, ProductId, StorageTarget, UserId,
};

use crate::engine::Storefront;
use crate::error;
use crate::remote::RemoteError;

impl Storefront {
    /// Add `quantity` units of `product` in `selected_size` to the cart.
    ///
    /// An existing line with the same product and size is incremented;
    /// otherwise a new line is created. A quantity of zero does nothing.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&self, product: &Product, quantity: u32, selected_size: Option<String>) {
        if quantity == 0 {
            debug!("Ignoring add of zero units");
            return;
        }
        let key = CartKey::new(product.id.clone(), selected_size);

        let target = self.lock_target().await;
        match &*target {
            StorageTarget::Remote(uid) => {
                let item =
                    NewRemoteCartEntry::from_product(product, quantity, key.selected_size.clone());
                if let Err(e) = self.remote.increment_cart_item(uid, item).await {
                    error::report(&e, "add_item");
                }
            }
            StorageTarget::Local => {
                let mut cart = self.state.local_cart();
                match cart.iter_mut().find(|entry| entry.key() == key) {
                    Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
                    None => cart.push(LocalCartEntry {
                        product: product.clone(),
                        quantity,
                        selected_size: key.selected_size,
                    }),
                }
                self.persist_local_cart(cart, "add_item");
            }
        }
    }

    /// Remove the cart line for `key`, if present.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn remove_item(&self, key: &CartKey) {
        let target = self.lock_target().await;
        match &*target {
            StorageTarget::Remote(uid) => {
                if let Err(e) = self.remove_remote(uid, key).await {
                    error::report(&e, "remove_item");
                }
            }
            StorageTarget::Local => {
                let mut cart = self.state.local_cart();
                cart.retain(|entry| entry.key() != *key);
                self.persist_local_cart(cart, "remove_item");
            }
        }
    }

    /// Set the quantity of the cart line for `key`.
    ///
    /// A quantity of zero or less removes the line. Keys not in the cart are
    /// ignored.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn update_quantity(&self, key: &CartKey, quantity: i64) {
        if quantity <= 0 {
            return self.remove_item(key).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let target = self.lock_target().await;
        match &*target {
            StorageTarget::Remote(uid) => {
                let result = match self.remote.find_cart_item(uid, key).await {
                    Ok(Some(entry)) => {
                        self.remote
                            .set_cart_quantity(uid, &entry.id, quantity)
                            .await
                    }
                    Ok(None) => {
                        debug!("No remote cart line for key");
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    error::report(&e, "update_quantity");
                }
            }
            StorageTarget::Local => {
                let mut cart = self.state.local_cart();
                let Some(entry) = cart.iter_mut().find(|entry| entry.key() == *key) else {
                    debug!("No local cart line for key");
                    return;
                };
                entry.quantity = quantity;
                self.persist_local_cart(cart, "update_quantity");
            }
        }
    }

    /// Add `product_id` to favorites if absent, remove it otherwise.
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub async fn toggle_favorite(&self, product_id: &ProductId) {
        let target = self.lock_target().await;
        match &*target {
            StorageTarget::Remote(uid) => {
                match self.remote.toggle_favorite(uid, product_id).await {
                    Ok(favorite) => debug!(favorite, "Remote favorite toggled"),
                    Err(e) => error::report(&e, "toggle_favorite"),
                }
            }
            StorageTarget::Local => {
                let mut favorites = self.state.favorites();
                favorites.toggle(product_id);
                if let Err(e) = self.local.save_favorites(&favorites) {
                    error::report(&e, "toggle_favorite");
                }
                self.state.replace_favorites(favorites);
            }
        }
    }

    /// Remove every cart line.
    ///
    /// On the remote path each document is deleted individually; a failure
    /// part-way leaves the remaining lines in place.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) {
        let target = self.lock_target().await;
        match &*target {
            StorageTarget::Remote(uid) => {
                if let Err(e) = self.clear_remote(uid).await {
                    error::report(&e, "clear_cart");
                }
            }
            StorageTarget::Local => self.persist_local_cart(Vec::new(), "clear_cart"),
        }
    }

    /// Read-lock the storage target once the first auth state is handled.
    ///
    /// Until then the in-memory local collections have not been loaded.
    async fn lock_target(&self) -> RwLockReadGuard<'_, StorageTarget> {
        self.state.wait_ready().await;
        self.target.read().await
    }

    async fn remove_remote(&self, uid: &UserId, key: &CartKey) -> Result<(), RemoteError> {
        match self.remote.find_cart_item(uid, key).await? {
            Some(entry) => self.remote.delete_cart_item(uid, &entry.id).await,
            None => {
                debug!("No remote cart line for key");
                Ok(())
            }
        }
    }

    async fn clear_remote(&self, uid: &UserId) -> Result<(), RemoteError> {
        for entry in self.remote.cart_snapshot(uid).await? {
            self.remote.delete_cart_item(uid, &entry.id).await?;
        }
        Ok(())
    }

    /// Write the local cart and publish it, even if the write failed.
    fn persist_local_cart(&self, cart: Vec<LocalCartEntry>, context: &str) {
        if let Err(e) = self.local.save_cart(&cart) {
            error::report(&e, context);
        }
        self.state.replace_local_cart(cart);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use moscent_core::{AuthUser, FavoriteSet};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::SyncConfig;
    use crate::local::{LocalStore, MemoryKeyValueStore};
    use crate::remote::{DocumentStore, MemoryDocumentStore};
    use crate::session::MemoryAuthSession;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Fragrance {id}"),
            brand: "Dior".to_string(),
            price: dec!(140),
            discounted_price: None,
            image: None,
            available_sizes: vec!["30".to_string(), "100".to_string()],
        }
    }

    struct Harness {
        engine: Storefront,
        remote: Arc<MemoryDocumentStore>,
        local: LocalStore,
    }

    async fn harness(auth: MemoryAuthSession) -> Harness {
        let remote = Arc::new(MemoryDocumentStore::new());
        let local = LocalStore::in_memory();
        let engine = Storefront::start(
            Arc::new(auth),
            remote.clone(),
            local.clone(),
            &SyncConfig::default(),
        );
        engine.wait_ready().await;
        Harness {
            engine,
            remote,
            local,
        }
    }

    async fn remote_harness() -> (Harness, UserId) {
        let uid = UserId::new("u1");
        let h = harness(MemoryAuthSession::signed_in(AuthUser::new(uid.clone(), true))).await;
        // Waits for the observer to release the target after the merge.
        assert_eq!(h.engine.storage_target().await, StorageTarget::Remote(uid.clone()));
        (h, uid)
    }

    #[tokio::test]
    async fn test_local_add_merges_same_key() {
        let h = harness(MemoryAuthSession::new()).await;
        let p1 = product("P1");

        h.engine.add_item(&p1, 1, Some("100".to_string())).await;
        h.engine.add_item(&p1, 2, Some("100".to_string())).await;
        h.engine.add_item(&p1, 1, Some("30".to_string())).await;
        h.engine.add_item(&p1, 0, None).await;

        let cart = h.local.load_cart();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart[0].quantity, 3);
        assert_eq!(h.engine.state().snapshot().summary().total_quantity, 4);
    }

    #[tokio::test]
    async fn test_local_update_to_zero_removes() {
        let h = harness(MemoryAuthSession::new()).await;
        let key = CartKey::new(ProductId::new("P1"), None);
        h.engine.add_item(&product("P1"), 2, None).await;

        h.engine.update_quantity(&key, 5).await;
        assert_eq!(h.local.load_cart()[0].quantity, 5);

        h.engine.update_quantity(&key, -1).await;
        assert!(h.local.load_cart().is_empty());
        assert!(h.engine.state().snapshot().cart.is_empty());
    }

    #[tokio::test]
    async fn test_local_toggle_and_clear() {
        let h = harness(MemoryAuthSession::new()).await;
        let id = ProductId::new("P1");

        h.engine.toggle_favorite(&id).await;
        assert!(h.local.load_favorites().contains(&id));
        h.engine.toggle_favorite(&id).await;
        assert_eq!(h.engine.state().snapshot().favorites, FavoriteSet::new());

        h.engine.add_item(&product("P2"), 1, None).await;
        h.engine.clear_cart().await;
        assert!(h.local.load_cart().is_empty());
    }

    #[tokio::test]
    async fn test_local_write_failure_still_updates_state() {
        let auth = Arc::new(MemoryAuthSession::new());
        let local = LocalStore::new(Arc::new(MemoryKeyValueStore::with_quota(16)));
        let engine = Storefront::start(
            auth,
            Arc::new(MemoryDocumentStore::new()),
            local.clone(),
            &SyncConfig::default(),
        );
        engine.wait_ready().await;

        engine.add_item(&product("P1"), 1, None).await;
        engine.add_item(&product("P2"), 1, None).await;
        engine.add_item(&product("P1"), 2, None).await;
        engine.toggle_favorite(&ProductId::new("A")).await;
        engine.toggle_favorite(&ProductId::new("B")).await;

        assert!(local.load_cart().is_empty());
        assert!(local.load_favorites().is_empty());

        let snapshot = engine.state().snapshot();
        let quantities: Vec<_> = snapshot
            .cart
            .iter()
            .map(|line| (line.product_id.as_str(), line.quantity))
            .collect();
        assert_eq!(quantities, vec![("P1", 3), ("P2", 1)]);
        assert_eq!(
            snapshot.favorites,
            [ProductId::new("A"), ProductId::new("B")]
                .into_iter()
                .collect::<FavoriteSet>()
        );

        let key = CartKey::new(ProductId::new("P2"), None);
        engine.update_quantity(&key, 4).await;
        engine.remove_item(&CartKey::new(ProductId::new("P1"), None)).await;
        let cart = engine.state().snapshot().cart;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 4);
    }

    #[tokio::test]
    async fn test_mutation_before_ready_keeps_stored_cart() {
        let local = LocalStore::in_memory();
        local
            .save_cart(&[LocalCartEntry {
                product: product("P1"),
                quantity: 2,
                selected_size: None,
            }])
            .unwrap();
        let engine = Storefront::start(
            Arc::new(MemoryAuthSession::new()),
            Arc::new(MemoryDocumentStore::new()),
            local.clone(),
            &SyncConfig::default(),
        );

        engine.add_item(&product("P2"), 1, None).await;

        let cart = local.load_cart();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_remote_add_is_keyed_by_size() {
        let (h, uid) = remote_harness().await;
        let p1 = product("P1");

        h.engine.add_item(&p1, 1, Some("100".to_string())).await;
        h.engine.add_item(&p1, 1, Some("100".to_string())).await;
        h.engine.add_item(&p1, 1, Some("30".to_string())).await;

        let cart = h.remote.cart_snapshot(&uid).await.unwrap();
        assert_eq!(cart.len(), 2);
        assert!(h.local.load_cart().is_empty());

        let mut rx = h.engine.state().subscribe();
        tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| s.summary().total_quantity == 3),
        )
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn test_remote_update_and_remove() {
        let (h, uid) = remote_harness().await;
        let key = CartKey::new(ProductId::new("P1"), None);
        h.engine.add_item(&product("P1"), 1, None).await;

        h.engine.update_quantity(&key, 4).await;
        assert_eq!(h.remote.cart_snapshot(&uid).await.unwrap()[0].quantity, 4);

        h.engine.update_quantity(&key, 0).await;
        assert!(h.remote.cart_snapshot(&uid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_toggle_and_clear() {
        let (h, uid) = remote_harness().await;
        let id = ProductId::new("P9");

        h.engine.toggle_favorite(&id).await;
        assert!(h.remote.favorites_snapshot(&uid).await.unwrap().contains(&id));

        h.engine.add_item(&product("P1"), 1, None).await;
        h.engine.add_item(&product("P2"), 1, None).await;
        h.engine.clear_cart().await;
        assert!(h.remote.cart_snapshot(&uid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_is_swallowed() {
        let (h, uid) = remote_harness().await;
        h.remote.set_offline(true);

        h.engine.add_item(&product("P1"), 1, None).await;
        h.engine.toggle_favorite(&ProductId::new("P1")).await;

        h.remote.set_offline(false);
        assert!(h.remote.cart_snapshot(&uid).await.unwrap().is_empty());
        assert!(h.local.load_cart().is_empty());
    }
}
