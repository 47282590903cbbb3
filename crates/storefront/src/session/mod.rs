//! Authentication boundary and the session observer.
//!
//! The engine consumes the authentication provider as a stream of
//! `Option<AuthUser>` values (`None` = signed out). [`observer`] turns those
//! values into storage-target transitions.

pub(crate) mod observer;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;

use moscent_core::AuthUser;

/// The authentication provider, as seen by the sync engine.
pub trait AuthSession: Send + Sync {
    /// The currently signed-in user, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Auth state changes: the current state first, then every change.
    fn subscribe(&self) -> BoxStream<'static, Option<AuthUser>>;
}

/// In-process authentication provider for tests and the CLI.
#[derive(Debug)]
pub struct MemoryAuthSession {
    tx: watch::Sender<Option<AuthUser>>,
}

impl MemoryAuthSession {
    /// A provider with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// A provider that starts with `user` already signed in, as when a
    /// persisted session is restored at startup.
    #[must_use]
    pub fn signed_in(user: AuthUser) -> Self {
        let (tx, _) = watch::channel(Some(user));
        Self { tx }
    }

    pub fn sign_in(&self, user: AuthUser) {
        self.tx.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Mark the signed-in user's email as verified and emit the change.
    pub fn verify_email(&self) {
        self.tx.send_modify(|user| {
            if let Some(user) = user {
                user.email_verified = true;
            }
        });
    }

    /// Re-emit the current state unchanged (a token refresh, for instance).
    pub fn refresh(&self) {
        self.tx.send_modify(|_| {});
    }
}

impl Default for MemoryAuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSession for MemoryAuthSession {
    fn current_user(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> BoxStream<'static, Option<AuthUser>> {
        let rx = self.tx.subscribe();
        futures::stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let user = rx.borrow_and_update().clone();
            Some((user, (rx, false)))
        })
        .boxed()
    }
}
