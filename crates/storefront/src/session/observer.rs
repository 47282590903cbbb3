//! Turns auth state changes into storage-target transitions.
//!
//! The observer is the only writer of the authoritative [`StorageTarget`].
//! It holds the write lock for the whole transition, so a mutator issued
//! during a login merge waits for the merge to settle and then dispatches to
//! whichever store won.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use moscent_core::{AuthUser, Session, StorageTarget, UserId};

use crate::error;
use crate::local::LocalStore;
use crate::merge::{self, QuantityMergePolicy};
use crate::remote::DocumentStore;
use crate::state::ShopState;
use crate::sync::LiveSync;

pub struct Observer {
    pub remote: Arc<dyn DocumentStore>,
    pub local: LocalStore,
    pub state: ShopState,
    pub target: Arc<RwLock<StorageTarget>>,
    pub policy: QuantityMergePolicy,
}

impl Observer {
    /// Spawn the observer loop over `changes`.
    pub fn spawn(self, changes: BoxStream<'static, Option<AuthUser>>) -> JoinHandle<()> {
        tokio::spawn(self.run(changes))
    }

    async fn run(self, mut changes: BoxStream<'static, Option<AuthUser>>) {
        let mut live: Option<LiveSync> = None;
        let mut last: Option<StorageTarget> = None;

        while let Some(user) = changes.next().await {
            let desired = Session::from(user).storage_target();

            // Token refreshes and duplicate deliveries re-emit the same state.
            if last.as_ref() == Some(&desired) {
                debug!(target_store = ?desired, "Auth state unchanged, skipping");
                continue;
            }
            last = Some(desired.clone());

            let mut target = self.target.write().await;
            // Listeners for the previous user must be gone before any merge
            // writes land, or their emissions would race the new state.
            drop(live.take());

            match desired {
                StorageTarget::Remote(uid) => {
                    live = self.enter_remote(&mut target, uid).await;
                }
                StorageTarget::Local => self.enter_local(&mut target),
            }
        }

        debug!("Auth stream ended, session observer stopping");
    }

    async fn enter_remote(&self, target: &mut StorageTarget, uid: UserId) -> Option<LiveSync> {
        info!(user_id = %uid, "Verified user signed in, merging local state");

        match merge::run_merge(self.remote.as_ref(), &self.local, &uid, self.policy).await {
            Ok(_) => {
                *target = StorageTarget::Remote(uid.clone());
                self.state.show_remote(target.clone());
                error::set_sentry_user(&uid);
                Some(LiveSync::attach(self.remote.as_ref(), uid, &self.state))
            }
            Err(e) => {
                error::report(&e, "login_merge");
                warn!(user_id = %uid, "Merge failed, keeping local storage authoritative");
                *target = StorageTarget::Local;
                self.show_local();
                None
            }
        }
    }

    fn enter_local(&self, target: &mut StorageTarget) {
        if target.user_id().is_some() {
            info!("Signed out, switching to local storage");
        }
        *target = StorageTarget::Local;
        error::clear_sentry_user();
        self.show_local();
    }

    fn show_local(&self) {
        self.state
            .show_local(self.local.load_cart(), self.local.load_favorites());
    }
}
