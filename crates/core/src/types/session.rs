//! Authentication session and the storage target it selects.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The signed-in user as reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: UserId,
    pub email_verified: bool,
}

impl AuthUser {
    #[must_use]
    pub fn new(uid: impl Into<UserId>, email_verified: bool) -> Self {
        Self {
            uid: uid.into(),
            email_verified,
        }
    }
}

/// Authentication state of the current shopper.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(AuthUser),
}

impl Session {
    /// Which store holds the cart and favorites for this session.
    ///
    /// Users who have not verified their email keep using local storage;
    /// sync is withheld until verification.
    #[must_use]
    pub fn storage_target(&self) -> StorageTarget {
        match self {
            Self::Authenticated(user) if user.email_verified => {
                StorageTarget::Remote(user.uid.clone())
            }
            Self::Authenticated(_) | Self::Anonymous => StorageTarget::Local,
        }
    }
}

impl From<Option<AuthUser>> for Session {
    fn from(user: Option<AuthUser>) -> Self {
        user.map_or(Self::Anonymous, Self::Authenticated)
    }
}

/// The store that is authoritative for cart and favorites writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum StorageTarget {
    /// Device-local key-value storage.
    #[default]
    Local,
    /// The user's collections in the document database.
    Remote(UserId),
}

impl StorageTarget {
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Remote(uid) => Some(uid),
            Self::Local => None,
        }
    }
}
