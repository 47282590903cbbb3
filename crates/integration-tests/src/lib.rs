//! Integration tests for the MoScent sync engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p moscent-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `login_merge` - Session transitions and the login merge
//! - `mutators` - Cart and favorites writes on both storage paths
//! - `local_persistence` - File-backed local storage across engine restarts
//!
//! Every scenario runs against the in-process auth provider and document
//! store, so no external services are needed.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use moscent_core::{AuthUser, LocalCartEntry, Product, ProductId, UserId};
use moscent_storefront::{
    LocalStore, MemoryAuthSession, MemoryDocumentStore, QuantityMergePolicy, ShopSnapshot,
    Storefront, SyncConfig,
};
use rust_decimal_macros::dec;

/// Upper bound on how long a scenario waits for the engine to settle.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared stores plus the auth provider driving one engine.
pub struct TestContext {
    pub auth: Arc<MemoryAuthSession>,
    pub remote: Arc<MemoryDocumentStore>,
    pub local: LocalStore,
}

impl TestContext {
    /// Anonymous shopper with empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::with_auth(MemoryAuthSession::new())
    }

    #[must_use]
    pub fn with_auth(auth: MemoryAuthSession) -> Self {
        Self {
            auth: Arc::new(auth),
            remote: Arc::new(MemoryDocumentStore::new()),
            local: LocalStore::in_memory(),
        }
    }

    /// Start an engine over these stores and wait for the first auth state.
    pub async fn start(&self, policy: QuantityMergePolicy) -> Storefront {
        let config = SyncConfig {
            merge_policy: policy,
            ..SyncConfig::default()
        };
        let engine = Storefront::start(
            self.auth.clone(),
            self.remote.clone(),
            self.local.clone(),
            &config,
        );
        engine.wait_ready().await;
        engine
    }

    /// Sign in a verified user and wait until the engine has switched to
    /// their remote collections.
    pub async fn sign_in_verified(&self, engine: &Storefront, uid: &str) -> UserId {
        let uid = UserId::new(uid);
        self.auth.sign_in(AuthUser::new(uid.clone(), true));
        wait_for(engine, |s| s.target.user_id() == Some(&uid)).await;
        uid
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait until the published state satisfies `predicate`.
///
/// # Panics
///
/// Panics if the state does not settle within [`SETTLE_TIMEOUT`].
pub async fn wait_for(
    engine: &Storefront,
    predicate: impl FnMut(&ShopSnapshot) -> bool,
) -> ShopSnapshot {
    let mut rx = engine.state().subscribe();
    match tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(predicate)).await {
        Ok(Ok(snapshot)) => snapshot.clone(),
        Ok(Err(_)) => panic!("state channel closed"),
        Err(_) => panic!("state did not settle: {:?}", engine.state().snapshot()),
    }
}

/// Let the observer and listener tasks drain their pending work.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// A catalog product with 30ml and 100ml sizes.
#[must_use]
pub fn product(id: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Fragrance {id}"),
        brand: "Versace".to_string(),
        price: dec!(70),
        discounted_price: None,
        image: Some(format!("/images/{id}.webp")),
        available_sizes: vec!["30".to_string(), "100".to_string()],
    }
}

#[must_use]
pub fn local_entry(id: &str, size: Option<&str>, quantity: u32) -> LocalCartEntry {
    LocalCartEntry {
        product: product(id),
        quantity,
        selected_size: size.map(str::to_string),
    }
}
