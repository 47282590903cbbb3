//! Integration tests for session transitions and the login merge.
//!
//! Each test seeds local and remote state, drives the in-process auth
//! provider through a transition and checks where the cart and favorites
//! ended up.

#![allow(clippy::unwrap_used)]

use moscent_core::{
    AuthUser, CartKey, FavoriteSet, NewRemoteCartEntry, ProductId, StorageTarget, UserId,
};
use moscent_integration_tests::{TestContext, local_entry, product, settle, wait_for};
use moscent_storefront::{DocumentStore, MemoryAuthSession, QuantityMergePolicy};

fn favorites(ids: &[&str]) -> FavoriteSet {
    ids.iter().copied().map(ProductId::new).collect()
}

// =============================================================================
// Merge Outcome Tests
// =============================================================================

#[tokio::test]
async fn test_login_sums_matching_cart_lines() {
    let ctx = TestContext::new();
    let uid = UserId::new("u1");
    ctx.remote
        .increment_cart_item(&uid, NewRemoteCartEntry::from_product(&product("P1"), 3, None))
        .await
        .unwrap();
    ctx.local.save_cart(&[local_entry("P1", None, 2)]).unwrap();

    let engine = ctx.start(QuantityMergePolicy::Sum).await;
    ctx.sign_in_verified(&engine, "u1").await;

    let cart = ctx.remote.cart_snapshot(&uid).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 5);

    let snapshot = wait_for(&engine, |s| s.summary().total_quantity == 5).await;
    assert_eq!(snapshot.cart.len(), 1);
    assert!(snapshot.cart[0].id.is_some());
}

#[tokio::test]
async fn test_login_max_policy_keeps_larger_quantity() {
    let ctx = TestContext::new();
    let uid = UserId::new("u1");
    ctx.remote
        .increment_cart_item(&uid, NewRemoteCartEntry::from_product(&product("P1"), 3, None))
        .await
        .unwrap();
    ctx.local.save_cart(&[local_entry("P1", None, 2)]).unwrap();

    let engine = ctx.start(QuantityMergePolicy::Max).await;
    ctx.sign_in_verified(&engine, "u1").await;

    assert_eq!(ctx.remote.cart_snapshot(&uid).await.unwrap()[0].quantity, 3);
}

#[tokio::test]
async fn test_login_unions_favorites() {
    let ctx = TestContext::new();
    let uid = UserId::new("u1");
    ctx.remote.toggle_favorite(&uid, &ProductId::new("B")).await.unwrap();
    ctx.remote.toggle_favorite(&uid, &ProductId::new("C")).await.unwrap();
    ctx.local.save_favorites(&favorites(&["A", "B"])).unwrap();

    let engine = ctx.start(QuantityMergePolicy::Sum).await;
    ctx.sign_in_verified(&engine, "u1").await;

    assert_eq!(
        ctx.remote.favorites_snapshot(&uid).await.unwrap(),
        favorites(&["A", "B", "C"])
    );
    wait_for(&engine, |s| s.favorites == favorites(&["A", "B", "C"])).await;
}

#[tokio::test]
async fn test_login_keeps_sizes_apart_and_clears_local() {
    let ctx = TestContext::new();
    ctx.local
        .save_cart(&[
            local_entry("P1", Some("30"), 1),
            local_entry("P1", Some("100"), 2),
        ])
        .unwrap();
    ctx.local.save_favorites(&favorites(&["P1"])).unwrap();

    let engine = ctx.start(QuantityMergePolicy::Sum).await;
    let uid = ctx.sign_in_verified(&engine, "u1").await;

    let cart = ctx.remote.cart_snapshot(&uid).await.unwrap();
    assert_eq!(cart.len(), 2);
    assert!(ctx.local.load_cart().is_empty());
    assert!(ctx.local.load_favorites().is_empty());
    assert_eq!(ctx.remote.commit_count(), 1);
}

#[tokio::test]
async fn test_login_with_empty_local_commits_nothing() {
    let ctx = TestContext::new();
    let engine = ctx.start(QuantityMergePolicy::Sum).await;
    ctx.sign_in_verified(&engine, "u1").await;

    assert_eq!(ctx.remote.commit_count(), 0);
}

// =============================================================================
// Failure and Policy Tests
// =============================================================================

#[tokio::test]
async fn test_merge_failure_keeps_local_authoritative() {
    let ctx = TestContext::new();
    ctx.local.save_cart(&[local_entry("P1", None, 2)]).unwrap();
    let engine = ctx.start(QuantityMergePolicy::Sum).await;

    ctx.remote.fail_next_commit();
    ctx.auth.sign_in(AuthUser::new("u1", true));
    settle().await;

    assert_eq!(engine.storage_target().await, StorageTarget::Local);
    assert_eq!(ctx.local.load_cart().len(), 1);
    let snapshot = engine.state().snapshot();
    assert_eq!(snapshot.target, StorageTarget::Local);
    assert_eq!(snapshot.summary().total_quantity, 2);

    // Writes keep going to local storage while the merge is unresolved.
    engine.add_item(&product("P2"), 1, None).await;
    assert_eq!(ctx.local.load_cart().len(), 2);
    let remote_cart = ctx.remote.cart_snapshot(&UserId::new("u1")).await.unwrap();
    assert!(remote_cart.is_empty());
}

#[tokio::test]
async fn test_unverified_user_stays_local_until_verified() {
    let ctx = TestContext::new();
    let engine = ctx.start(QuantityMergePolicy::Sum).await;

    ctx.auth.sign_in(AuthUser::new("u1", false));
    settle().await;
    engine.add_item(&product("P1"), 1, None).await;

    assert_eq!(engine.storage_target().await, StorageTarget::Local);
    assert_eq!(ctx.local.load_cart().len(), 1);

    ctx.auth.verify_email();
    let uid = UserId::new("u1");
    wait_for(&engine, |s| s.target.user_id() == Some(&uid)).await;

    assert_eq!(ctx.remote.cart_snapshot(&uid).await.unwrap().len(), 1);
    assert!(ctx.local.load_cart().is_empty());
}

#[tokio::test]
async fn test_duplicate_auth_callbacks_merge_once() {
    let ctx = TestContext::new();
    ctx.local.save_favorites(&favorites(&["A"])).unwrap();
    let engine = ctx.start(QuantityMergePolicy::Sum).await;
    ctx.sign_in_verified(&engine, "u1").await;

    // Local storage was cleared by the merge; refill it to detect a re-merge.
    ctx.local.save_favorites(&favorites(&["Z"])).unwrap();
    ctx.auth.refresh();
    settle().await;
    ctx.auth.refresh();
    settle().await;

    assert_eq!(ctx.remote.commit_count(), 1);
    assert_eq!(ctx.local.load_favorites(), favorites(&["Z"]));
}

#[tokio::test]
async fn test_restored_session_starts_remote() {
    let ctx = TestContext::with_auth(MemoryAuthSession::signed_in(AuthUser::new("u1", true)));
    let uid = UserId::new("u1");
    ctx.remote.toggle_favorite(&uid, &ProductId::new("A")).await.unwrap();

    let engine = ctx.start(QuantityMergePolicy::Sum).await;

    assert_eq!(engine.storage_target().await, StorageTarget::Remote(uid));
    wait_for(&engine, |s| s.favorites.len() == 1).await;
}

// =============================================================================
// Sign-out Tests
// =============================================================================

#[tokio::test]
async fn test_sign_out_reloads_local_state() {
    let ctx = TestContext::new();
    let engine = ctx.start(QuantityMergePolicy::Sum).await;
    let uid = ctx.sign_in_verified(&engine, "u1").await;

    engine.add_item(&product("P1"), 2, None).await;
    wait_for(&engine, |s| s.cart.len() == 1).await;

    ctx.auth.sign_out();
    let snapshot = wait_for(&engine, |s| s.target == StorageTarget::Local).await;
    assert!(snapshot.cart.is_empty());

    // Remote changes after sign-out no longer reach local state.
    ctx.remote
        .increment_cart_item(&uid, NewRemoteCartEntry::from_product(&product("P2"), 1, None))
        .await
        .unwrap();
    settle().await;
    assert!(engine.state().snapshot().cart.is_empty());

    engine.add_item(&product("P3"), 1, Some("30".to_string())).await;
    assert_eq!(
        ctx.local.load_cart()[0].key(),
        CartKey::new(ProductId::new("P3"), Some("30".to_string()))
    );
    assert_eq!(ctx.remote.cart_snapshot(&uid).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_switching_users_detaches_previous_listeners() {
    let ctx = TestContext::new();
    let engine = ctx.start(QuantityMergePolicy::Sum).await;
    let first = ctx.sign_in_verified(&engine, "u1").await;
    engine.add_item(&product("P1"), 1, None).await;
    wait_for(&engine, |s| s.cart.len() == 1).await;

    let second = ctx.sign_in_verified(&engine, "u2").await;
    let snapshot = wait_for(&engine, |s| s.target.user_id() == Some(&second)).await;
    assert!(snapshot.cart.is_empty());

    ctx.remote
        .increment_cart_item(&first, NewRemoteCartEntry::from_product(&product("P2"), 1, None))
        .await
        .unwrap();
    settle().await;
    assert!(engine.state().snapshot().cart.is_empty());
}
