//! One-time reconciliation of local storage into a user's remote collections.
//!
//! Runs when the session transitions from anonymous (or unverified) to a
//! verified user. Planning is a pure function over two snapshots; applying the
//! plan is a single atomic batch, after which local storage is cleared.
//!
//! | Local entry key       | Remote write                                   |
//! |-----------------------|------------------------------------------------|
//! | present remotely      | `SetCartQuantity` with the combined quantity   |
//! | absent remotely       | `CreateCartItem` with a fresh server timestamp |
//! | favorite not remote   | `CreateFavorite`                               |
//! | favorite already remote | nothing                                      |

use std::collections::HashMap;
use std::str::FromStr;

use tracing::{info, instrument};

use moscent_core::{
    CartKey, FavoriteSet, LocalCartEntry, NewRemoteCartEntry, RemoteCartEntry, UserId,
    coalesce_local,
};

use crate::error::{self, SyncError};
use crate::local::{LocalStore, LocalStoreError};
use crate::remote::{DocumentStore, WriteBatch, WriteOp};

/// How a local quantity combines with a remote quantity for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantityMergePolicy {
    /// Add both quantities: independent adds on each side are cumulative.
    #[default]
    Sum,
    /// Keep the larger quantity: the two sides are assumed to overlap.
    Max,
}

impl QuantityMergePolicy {
    #[must_use]
    pub fn combine(self, remote: u32, local: u32) -> u32 {
        match self {
            Self::Sum => remote.saturating_add(local),
            Self::Max => remote.max(local),
        }
    }
}

/// Error parsing a [`QuantityMergePolicy`].
#[derive(Debug, thiserror::Error)]
#[error("unknown merge policy '{0}' (expected 'sum' or 'max')")]
pub struct ParsePolicyError(String);

impl FromStr for QuantityMergePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "max" => Ok(Self::Max),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// The writes needed to fold local state into remote state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub batch: WriteBatch,
    pub cart_created: usize,
    pub cart_updated: usize,
    pub favorites_created: usize,
}

/// Compute the batch that merges local cart and favorites into remote.
#[must_use]
pub fn plan_merge(
    local_cart: &[LocalCartEntry],
    local_favorites: &FavoriteSet,
    remote_cart: &[RemoteCartEntry],
    remote_favorites: &FavoriteSet,
    policy: QuantityMergePolicy,
) -> MergePlan {
    let mut remote_by_key: HashMap<CartKey, &RemoteCartEntry> = HashMap::new();
    for entry in remote_cart {
        remote_by_key.entry(entry.key()).or_insert(entry);
    }

    let mut plan = MergePlan::default();

    for local in coalesce_local(local_cart.to_vec()) {
        match remote_by_key.get(&local.key()) {
            Some(remote) => {
                let quantity = policy.combine(remote.quantity, local.quantity);
                if quantity != remote.quantity {
                    plan.batch.push(WriteOp::SetCartQuantity {
                        id: remote.id.clone(),
                        quantity,
                    });
                    plan.cart_updated += 1;
                }
            }
            None => {
                plan.batch
                    .push(WriteOp::CreateCartItem(NewRemoteCartEntry::from_local(&local)));
                plan.cart_created += 1;
            }
        }
    }

    for product_id in local_favorites {
        if !remote_favorites.contains(product_id) {
            plan.batch.push(WriteOp::CreateFavorite(product_id.clone()));
            plan.favorites_created += 1;
        }
    }

    plan
}

/// Merge local storage into `uid`'s collections and clear local storage.
///
/// Remote state is read once (not through a live listener) so the plan is
/// built from a consistent snapshot. Local storage is only cleared after the
/// batch commits, and only for the keys that held merged entries. A key that
/// loaded empty, possibly because it could not be read, is left alone.
///
/// # Errors
///
/// Returns `SyncError::Remote` if either snapshot read or the commit fails;
/// local storage is untouched in that case.
#[instrument(skip(remote, local, uid), fields(user_id = %uid))]
pub async fn run_merge(
    remote: &dyn DocumentStore,
    local: &LocalStore,
    uid: &UserId,
    policy: QuantityMergePolicy,
) -> Result<MergePlan, SyncError> {
    let local_cart = local.load_cart();
    let local_favorites = local.load_favorites();

    if local_cart.is_empty() && local_favorites.is_empty() {
        info!("Nothing to merge from local storage");
        return Ok(MergePlan::default());
    }

    let remote_cart = remote.cart_snapshot(uid).await?;
    let remote_favorites = remote.favorites_snapshot(uid).await?;

    let plan = plan_merge(
        &local_cart,
        &local_favorites,
        &remote_cart,
        &remote_favorites,
        policy,
    );

    if !plan.batch.is_empty() {
        remote.commit(uid, plan.batch.clone()).await?;
    }

    if !local_cart.is_empty() {
        report_clear_failure(local.clear_cart());
    }
    if !local_favorites.is_empty() {
        report_clear_failure(local.clear_favorites());
    }
    info!(
        cart_created = plan.cart_created,
        cart_updated = plan.cart_updated,
        favorites_created = plan.favorites_created,
        "Local state merged into remote"
    );
    Ok(plan)
}

fn report_clear_failure(result: Result<(), LocalStoreError>) {
    // The batch has landed; a stale local copy would be merged again on the
    // next sign-in, so the failure is reported but not fatal.
    if let Err(e) = result {
        error::report(&e, "merge_clear_local");
    }
}
