//! Unified error handling with Sentry integration.
//!
//! Errors in the sync engine are terminal at the point of catch: mutators,
//! listeners and the session observer log them and carry on with the last
//! known good state. [`report`] is the single place where a swallowed error is
//! logged and captured to Sentry.

use thiserror::Error;

use crate::local::LocalStoreError;
use crate::remote::RemoteError;

/// Error type for sync engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Device-local storage failed.
    #[error("Local store error: {0}")]
    Local(#[from] LocalStoreError),

    /// Document database operation failed.
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Log a swallowed error and capture it to Sentry.
///
/// `context` names the operation that failed (e.g. `"add_item"`) and is
/// attached to both the log line and the Sentry event.
pub fn report<E>(error: &E, context: &str)
where
    E: std::error::Error + 'static,
{
    let event_id = sentry::with_scope(
        |scope| scope.set_tag("operation", context),
        || sentry::capture_error(error),
    );
    tracing::error!(
        error = %error,
        operation = context,
        sentry_event_id = %event_id,
        "Sync operation failed"
    );
}

/// Set the Sentry user context from a user ID.
///
/// Called by the session observer once a verified user becomes authoritative.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Called on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::from(RemoteError::PermissionDenied("users/u1/cart".to_string()));
        assert_eq!(
            err.to_string(),
            "Remote store error: permission denied: users/u1/cart"
        );
    }

    #[test]
    fn test_report_without_sentry_client_does_not_panic() {
        let err = SyncError::from(RemoteError::Unavailable("offline".to_string()));
        report(&err, "test");
    }
}
