//! Live mirroring of a user's remote collections into application state.
//!
//! Two independent listeners (cart, favorites) run while a verified user is
//! signed in. Each emission replaces the in-memory collection wholesale, so
//! any local edit not yet reflected remotely is overwritten.
//! Listeners are not buffered: events while detached are never observed, and
//! the next attach starts from a fresh snapshot.

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use moscent_core::{CartLine, UserId};

use crate::error;
use crate::remote::DocumentStore;
use crate::state::ShopState;

/// Handle to the cart and favorites listeners of one user.
///
/// Dropping the handle unsubscribes both listeners.
#[derive(Debug)]
pub struct LiveSync {
    uid: UserId,
    cart: JoinHandle<()>,
    favorites: JoinHandle<()>,
}

impl LiveSync {
    /// Subscribe to `uid`'s collections and mirror them into `state`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn attach(store: &dyn DocumentStore, uid: UserId, state: &ShopState) -> Self {
        let mut cart_stream = store.watch_cart(&uid);
        let mut favorites_stream = store.watch_favorites(&uid);

        let cart = {
            let state = state.clone();
            let uid = uid.clone();
            tokio::spawn(async move {
                while let Some(emission) = cart_stream.next().await {
                    match emission {
                        Ok(entries) => {
                            let lines = entries.iter().map(CartLine::from).collect::<Vec<_>>();
                            let count = lines.len();
                            if state.replace_remote_cart(&uid, lines) {
                                debug!(user_id = %uid, lines = count, "Cart snapshot applied");
                            }
                        }
                        Err(e) => error::report(&e, "cart_listener"),
                    }
                }
                debug!(user_id = %uid, "Cart listener stream ended");
            })
        };

        let favorites = {
            let state = state.clone();
            let uid = uid.clone();
            tokio::spawn(async move {
                while let Some(emission) = favorites_stream.next().await {
                    match emission {
                        Ok(set) => {
                            let count = set.len();
                            if state.replace_remote_favorites(&uid, set) {
                                debug!(
                                    user_id = %uid,
                                    favorites = count,
                                    "Favorites snapshot applied"
                                );
                            }
                        }
                        Err(e) => error::report(&e, "favorites_listener"),
                    }
                }
                debug!(user_id = %uid, "Favorites listener stream ended");
            })
        };

        info!(user_id = %uid, "Live sync attached");
        Self {
            uid,
            cart,
            favorites,
        }
    }

    /// User whose collections are being mirrored.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.uid
    }

    /// Unsubscribe both listeners.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for LiveSync {
    fn drop(&mut self) {
        self.cart.abort();
        self.favorites.abort();
        info!(user_id = %self.uid, "Live sync detached");
    }
}
