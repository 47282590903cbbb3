//! The sync engine shell: wires the observer, stores and state together.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use moscent_core::StorageTarget;

use crate::config::SyncConfig;
use crate::local::LocalStore;
use crate::remote::DocumentStore;
use crate::session::AuthSession;
use crate::session::observer::Observer;
use crate::state::{ShopSnapshot, ShopState};

/// A running cart and favorites sync engine.
///
/// Reads go through [`Self::state`]; writes go through the mutators
/// (`add_item`, `remove_item`, `update_quantity`, `toggle_favorite`,
/// `clear_cart`). Dropping the engine unsubscribes from auth changes and
/// detaches any live listeners. Remote writes already issued still complete.
pub struct Storefront {
    /// Held so the provider, and with it the change stream, outlives the
    /// observer.
    _auth: Arc<dyn AuthSession>,
    pub(crate) remote: Arc<dyn DocumentStore>,
    pub(crate) local: LocalStore,
    pub(crate) state: ShopState,
    pub(crate) target: Arc<RwLock<StorageTarget>>,
    observer: JoinHandle<()>,
}

impl Storefront {
    /// Subscribe to `auth` and start routing reads and writes.
    ///
    /// State stays in the loading phase until the first auth state has been
    /// handled; see [`Self::wait_ready`]. Must be called from within a Tokio
    /// runtime.
    #[must_use]
    pub fn start(
        auth: Arc<dyn AuthSession>,
        remote: Arc<dyn DocumentStore>,
        local: LocalStore,
        config: &SyncConfig,
    ) -> Self {
        let state = ShopState::new();
        let target = Arc::new(RwLock::new(StorageTarget::Local));

        let observer = Observer {
            remote: Arc::clone(&remote),
            local: local.clone(),
            state: state.clone(),
            target: Arc::clone(&target),
            policy: config.merge_policy,
        }
        .spawn(auth.subscribe());

        info!(merge_policy = ?config.merge_policy, "Sync engine started");

        Self {
            _auth: auth,
            remote,
            local,
            state,
            target,
            observer,
        }
    }

    /// Shared application state.
    #[must_use]
    pub const fn state(&self) -> &ShopState {
        &self.state
    }

    /// Wait for the first auth state to be handled, then return the view.
    pub async fn wait_ready(&self) -> ShopSnapshot {
        self.state.wait_ready().await
    }

    /// The store currently authoritative for writes.
    ///
    /// Waits while a login merge is in progress.
    pub async fn storage_target(&self) -> StorageTarget {
        self.target.read().await.clone()
    }

    /// Stop observing auth changes and detach live listeners.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Storefront {
    fn drop(&mut self) {
        // Aborting the observer drops its live sync handle, which aborts the
        // listener tasks in turn.
        self.observer.abort();
        info!("Sync engine stopped");
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("local", &self.local)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
