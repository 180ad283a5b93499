//! End-to-end cart operations over HTTP.
//!
//! These tests run the sync engine with the real `HttpCartApi` against the
//! in-process fake backend.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use cartwheel_core::{CartItemId, CartSnapshot, ProductId, Size};
use cartwheel_integration_tests::{FakeBackend, StoredLine, TEST_TOKEN};
use cartwheel_sync::{CartError, CountBadge, RemoveOutcome};

const P5: ProductId = ProductId::new(5);

// =============================================================================
// Load
// =============================================================================

#[tokio::test]
async fn test_reload_reads_server_cart() {
    let backend = FakeBackend::start().await;
    backend.seed_line(5, 2, 2);
    backend.seed_line(6, 8, 1);

    let engine = backend.engine();
    let snapshot = engine.reload_from_remote().await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.quantity_of(P5, Size::Large), 2);
    assert_eq!(snapshot.quantity_of(ProductId::new(6), Size::NoSize), 1);
    assert_eq!(snapshot.items()[0].id, Some(CartItemId::new(1)));
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let backend = FakeBackend::start().await;
    let engine = backend.engine();
    engine.reload_from_remote().await.unwrap();
    engine.add_or_update(P5, Size::Large, 1).await.unwrap();

    let expected = Some(format!("Bearer {TEST_TOKEN}"));
    backend.with_state(|state| {
        assert_eq!(state.authorization.len(), 2);
        assert!(state.authorization.iter().all(|h| *h == expected));
    });
}

// =============================================================================
// Add / Update
// =============================================================================

#[tokio::test]
async fn test_add_update_and_second_size() {
    let backend = FakeBackend::start().await;
    let engine = backend.engine();
    let navbar = CountBadge::attach(engine.store(), "navbar");
    let footer = CountBadge::attach(engine.store(), "footer");

    engine.add_or_update(P5, Size::Large, 2).await.unwrap();
    assert_eq!((navbar.count(), footer.count()), (2, 2));

    engine.add_or_update(P5, Size::Large, 3).await.unwrap();
    let snapshot = engine.add_or_update(P5, Size::Small, 1).await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.quantity_of(P5, Size::Large), 3);
    assert_eq!((navbar.count(), footer.count()), (4, 4));
    assert_eq!(
        backend.requests(),
        vec![
            "POST Cart/AddToCartAsync id=0 product=5 size=2 qty=2",
            "POST Cart/AddToCartAsync id=0 product=5 size=2 qty=3",
            "POST Cart/AddToCartAsync id=0 product=5 size=0 qty=1",
        ]
    );
    assert_eq!(
        backend.lines(),
        vec![
            StoredLine {
                id: 1,
                product_id: 5,
                size: 2,
                quantity: 3
            },
            StoredLine {
                id: 2,
                product_id: 5,
                size: 0,
                quantity: 1
            },
        ]
    );
}

#[tokio::test]
async fn test_rejected_add_is_business_error_and_changes_nothing() {
    let backend = FakeBackend::start().await;
    let engine = backend.engine();
    engine.add_or_update(P5, Size::Large, 1).await.unwrap();
    let before = engine.snapshot();

    backend.with_state(|state| state.reject_adds = true);
    let err = engine
        .add_or_update(ProductId::new(6), Size::Small, 1)
        .await
        .unwrap_err();

    match &err {
        CartError::Business { message, errors } => {
            assert_eq!(message.as_deref(), Some("Not enough stock"));
            assert_eq!(errors, &vec!["Not enough stock".to_string()]);
        }
        other => panic!("expected business error, got {other:?}"),
    }
    assert_eq!(engine.snapshot(), before);
}

#[tokio::test]
async fn test_set_quantity_uses_quantity_route() {
    let backend = FakeBackend::start().await;
    let id = backend.seed_line(5, 2, 1);
    let engine = backend.engine();
    engine.reload_from_remote().await.unwrap();

    let snapshot = engine.set_quantity(P5, Size::Large, 4).await.unwrap();

    assert_eq!(snapshot.quantity_of(P5, Size::Large), 4);
    assert!(
        backend
            .requests()
            .contains(&format!("PUT Cart/items/{id}/quantity qty=4"))
    );
    assert_eq!(backend.lines()[0].quantity, 4);
}

// =============================================================================
// Remove
// =============================================================================

#[tokio::test]
async fn test_remove_deletes_by_query_parameter() {
    let backend = FakeBackend::start().await;
    let id = backend.seed_line(5, 2, 2);
    let engine = backend.engine();
    engine.reload_from_remote().await.unwrap();

    let outcome = engine.remove(P5, Size::Large).await.unwrap();

    assert!(matches!(outcome, RemoveOutcome::RemovedRemote));
    assert!(engine.snapshot().is_empty());
    assert!(backend.lines().is_empty());
    assert!(
        backend
            .requests()
            .contains(&format!("DELETE Cart/DeleteCartItem cartItemId={id}"))
    );
}

#[tokio::test]
async fn test_failed_delete_reloads_server_cart() {
    let backend = FakeBackend::start().await;
    backend.seed_line(5, 2, 2);
    let engine = backend.engine();
    engine.reload_from_remote().await.unwrap();

    backend.with_state(|state| state.fail_deletes = true);
    let outcome = engine.remove(P5, Size::Large).await.unwrap();

    match outcome {
        RemoveOutcome::Reconciled { cause } => {
            assert!(cause.is_transport());
            assert!(matches!(cause, CartError::Http { status: 500, .. }));
        }
        other => panic!("expected reconciliation, got {other:?}"),
    }
    // The server still has the line, and so does the client again
    assert_eq!(engine.snapshot().quantity_of(P5, Size::Large), 2);
    assert_eq!(
        backend.requests().last().map(String::as_str),
        Some("GET Cart/GetMyCart")
    );
}

// =============================================================================
// Convergence
// =============================================================================

#[tokio::test]
async fn test_local_state_matches_server_after_sequence() {
    let backend = FakeBackend::start().await;
    let engine = backend.engine();
    let seen: Arc<Mutex<Vec<CartSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = engine
        .store()
        .subscribe(move |snapshot| sink.lock().unwrap().push(snapshot.clone()));

    engine.add_or_update(P5, Size::Large, 2).await.unwrap();
    engine.increment(P5, Size::Large).await.unwrap();
    engine.add_or_update(ProductId::new(7), Size::XL, 1).await.unwrap();
    engine.decrement(ProductId::new(7), Size::XL).await.unwrap();

    let local = engine.snapshot();
    let remote = engine.reload_from_remote().await.unwrap();
    assert_eq!(local, remote);
    assert_eq!(local.quantity_of(P5, Size::Large), 3);
    assert_eq!(local.len(), 1);

    // Every notification carried a complete snapshot with unique keys
    for snapshot in seen.lock().unwrap().iter() {
        let mut keys: Vec<_> = snapshot.items().iter().map(|i| i.key()).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let backend = FakeBackend::start().await;
    let engine = backend.engine();
    drop(backend);

    // Give the aborted server a moment to release the port
    tokio::task::yield_now().await;

    let err = engine.reload_from_remote().await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err}");
    assert!(engine.snapshot().is_empty());
}
