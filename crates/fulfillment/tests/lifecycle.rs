mod support;

use common::{OrderId, ProductId};
use domain::{Order, OrderStatus, TransitionAction};
use fulfillment::FulfillmentError;
use support::TestHarness;

/// Places an order for 2x SKU-A and 3x SKU-B out of stocks of 10 each.
async fn placed_order(h: &TestHarness) -> (Order, ProductId, ProductId) {
    let a = h.product("SKU-A", 1_000, 10).await;
    let b = h.product("SKU-B", 500, 10).await;
    let user = h.user_with_cart(&[(&a, 2), (&b, 3)]).await;
    let order = h.service.checkout(user, None).await.unwrap();
    (order, a, b)
}

#[tokio::test]
async fn approve_confirms_without_touching_inventory() {
    let h = TestHarness::new();
    let (order, a, b) = placed_order(&h).await;

    let order = h.service.approve_order(order.id()).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Confirmed);
    assert_eq!(h.inventory(&a).await, 8);
    assert_eq!(h.inventory(&b).await, 7);
}

#[tokio::test]
async fn cancelling_a_confirmed_order_restores_inventory() {
    let h = TestHarness::new();
    let (order, a, b) = placed_order(&h).await;
    h.service.approve_order(order.id()).await.unwrap();

    let cancelled = h.service.cancel_order(order.id()).await.unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(h.inventory(&a).await, 10);
    assert_eq!(h.inventory(&b).await, 10);

    let err = h.service.cancel_order(order.id()).await.unwrap_err();
    assert!(matches!(
        err,
        FulfillmentError::InvalidTransition {
            current: OrderStatus::Cancelled,
            action: TransitionAction::Cancel,
        }
    ));
    // Restored exactly once
    assert_eq!(h.inventory(&a).await, 10);
}

#[tokio::test]
async fn cancelling_a_pending_order_restores_inventory() {
    let h = TestHarness::new();
    let (order, a, _) = placed_order(&h).await;

    h.service.cancel_order(order.id()).await.unwrap();

    assert_eq!(h.inventory(&a).await, 10);
}

#[tokio::test]
async fn reject_only_applies_to_pending_orders() {
    let h = TestHarness::new();
    let (order, a, b) = placed_order(&h).await;

    let rejected = h.service.reject_order(order.id()).await.unwrap();
    assert_eq!(rejected.status(), OrderStatus::Cancelled);
    assert_eq!(h.inventory(&a).await, 10);
    assert_eq!(h.inventory(&b).await, 10);

    let c = h.product("SKU-C", 100, 4).await;
    let user = h.user_with_cart(&[(&c, 1)]).await;
    let confirmed = h.service.checkout(user, None).await.unwrap();
    h.service.approve_order(confirmed.id()).await.unwrap();

    let err = h.service.reject_order(confirmed.id()).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidTransition { .. }));
    assert_eq!(h.inventory(&c).await, 3);
}

#[tokio::test]
async fn approve_requires_pending() {
    let h = TestHarness::new();
    let (order, _, _) = placed_order(&h).await;
    h.service.approve_order(order.id()).await.unwrap();

    let err = h.service.approve_order(order.id()).await.unwrap_err();

    assert!(matches!(
        err,
        FulfillmentError::InvalidTransition {
            current: OrderStatus::Confirmed,
            action: TransitionAction::Approve,
        }
    ));
    assert_eq!(
        err.to_string(),
        "Invalid status transition: cannot approve from CONFIRMED status"
    );
}

#[tokio::test]
async fn override_never_restores_inventory() {
    let h = TestHarness::new();
    let (order, a, b) = placed_order(&h).await;

    let order = h
        .service
        .set_order_status(order.id(), OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert_eq!(h.inventory(&a).await, 8);
    assert_eq!(h.inventory(&b).await, 7);

    // Admin correction may move an order out of CANCELLED
    let order = h
        .service
        .set_order_status(order.id(), OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Shipped);
    assert_eq!(h.inventory(&a).await, 8);
}

#[tokio::test]
async fn status_names_are_parsed_case_insensitively() {
    let h = TestHarness::new();
    let (order, _, _) = placed_order(&h).await;
    let lifecycle = h.service.lifecycle();

    let order = lifecycle
        .set_status_named(order.id(), "delivered")
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Delivered);

    let err = lifecycle
        .set_status_named(order.id(), "LOST")
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidInput(_)));
    assert_eq!(
        h.service.get_order(order.id()).await.unwrap().status(),
        OrderStatus::Delivered
    );
}

#[tokio::test]
async fn every_transition_is_recorded() {
    let h = TestHarness::new();
    let (order, _, _) = placed_order(&h).await;

    h.service.approve_order(order.id()).await.unwrap();
    h.clock.advance(chrono::Duration::hours(1));
    h.service.cancel_order(order.id()).await.unwrap();

    let order = h.service.get_order(order.id()).await.unwrap();
    let history: Vec<_> = order
        .status_history()
        .iter()
        .map(|change| (change.from, change.to, change.action))
        .collect();
    assert_eq!(
        history,
        vec![
            (
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                TransitionAction::Approve
            ),
            (
                OrderStatus::Confirmed,
                OrderStatus::Cancelled,
                TransitionAction::Cancel
            ),
        ]
    );
    assert!(order.status_history()[1].at > order.status_history()[0].at);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let h = TestHarness::new();
    let missing = OrderId::new();

    for err in [
        h.service.get_order(missing).await.unwrap_err(),
        h.service.approve_order(missing).await.unwrap_err(),
        h.service.cancel_order(missing).await.unwrap_err(),
        h.service
            .set_order_status(missing, OrderStatus::Shipped)
            .await
            .unwrap_err(),
    ] {
        assert!(matches!(err, FulfillmentError::NotFound { entity: "order", .. }));
    }
}

#[tokio::test]
async fn failed_cancel_changes_nothing() {
    let h = TestHarness::new();
    let (order, a, _) = placed_order(&h).await;

    h.store.inject_conflicts(3);
    let err = h.service.cancel_order(order.id()).await.unwrap_err();

    assert!(matches!(err, FulfillmentError::Conflict { attempts: 3 }));
    assert_eq!(
        h.service.get_order(order.id()).await.unwrap().status(),
        OrderStatus::Pending
    );
    assert_eq!(h.inventory(&a).await, 8);
}
