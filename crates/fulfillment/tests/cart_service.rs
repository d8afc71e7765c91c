mod support;

use common::{ProductId, UserId};
use domain::{Money, Product};
use fulfillment::FulfillmentError;
use support::TestHarness;

#[tokio::test]
async fn cart_is_created_on_first_access() {
    let h = TestHarness::new();
    let user = h.user().await;

    let cart = h.service.get_cart(user).await.unwrap();

    assert!(cart.is_empty());
    assert_eq!(cart.user_id(), user);
    assert_eq!(cart.total_amount(), Money::zero());
    assert_eq!(h.store.document_count().await, 1);
}

#[tokio::test]
async fn adding_the_same_product_twice_merges_lines() {
    let h = TestHarness::new();
    let sku = h.product("SKU-001", 1_000, 50).await;
    let user = h.user().await;

    h.service.add_cart_item(user, &sku, 2).await.unwrap();
    let cart = h.service.add_cart_item(user, &sku, 3).await.unwrap();

    assert_eq!(cart.item_count(), 1);
    let line = cart.item(&sku).unwrap();
    assert_eq!(line.quantity, 5);
    assert_eq!(line.total_price, Money::from_cents(5_000));
    assert_eq!(cart.total_amount(), Money::from_cents(5_000));
}

#[tokio::test]
async fn total_is_the_sum_of_line_totals() {
    let h = TestHarness::new();
    let a = h.product("SKU-A", 1_999, 10).await;
    let b = h
        .publish(
            Product::new("SKU-B", "Discounted", Money::from_cents(5_000), 10)
                .with_discount_percentage(10),
        )
        .await;
    let user = h.user_with_cart(&[(&a, 3), (&b, 1)]).await;

    let cart = h.service.get_cart(user).await.unwrap();

    let sum: Money = cart.items().map(|item| item.total_price).sum();
    assert_eq!(cart.total_amount(), sum);
    assert_eq!(cart.total_amount(), Money::from_cents(5_997 + 4_500));
    assert_eq!(
        h.service.cart_total(user).await.unwrap(),
        Money::from_cents(10_497)
    );
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let h = TestHarness::new();
    let sku = h.product("SKU-001", 1_000, 5).await;
    let user = h.user().await;

    let err = h.service.add_cart_item(user, &sku, 0).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidInput(_)));

    h.service.add_cart_item(user, &sku, 1).await.unwrap();
    let err = h
        .service
        .set_cart_item_quantity(user, &sku, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidInput(_)));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let h = TestHarness::new();
    let user = h.user().await;

    let err = h
        .service
        .add_cart_item(user, &ProductId::new("SKU-404"), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::NotFound { entity: "product", .. }));
    assert!(h.service.get_cart(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let h = TestHarness::new();
    let sku = h.product("SKU-001", 1_000, 5).await;
    let stranger = UserId::new();

    let err = h.service.add_cart_item(stranger, &sku, 1).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::NotFound { entity: "user", .. }));

    let err = h.service.get_cart(stranger).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::NotFound { entity: "user", .. }));
}

#[tokio::test]
async fn remove_and_set_quantity() {
    let h = TestHarness::new();
    let a = h.product("SKU-A", 1_000, 10).await;
    let b = h.product("SKU-B", 250, 10).await;
    let user = h.user_with_cart(&[(&a, 1), (&b, 2)]).await;

    let cart = h.service.set_cart_item_quantity(user, &b, 4).await.unwrap();
    assert_eq!(cart.item(&b).unwrap().quantity, 4);
    assert_eq!(cart.total_amount(), Money::from_cents(2_000));

    let cart = h.service.remove_cart_item(user, &a).await.unwrap();
    assert!(cart.item(&a).is_none());
    assert_eq!(cart.total_amount(), Money::from_cents(1_000));

    let err = h.service.remove_cart_item(user, &a).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::NotFound { entity: "cart item", .. }));
}

#[tokio::test]
async fn get_cart_refreshes_prices_from_catalog() {
    let h = TestHarness::new();
    let sku = h.product("SKU-001", 1_000, 10).await;
    let user = h.user_with_cart(&[(&sku, 2)]).await;

    let mut product = h.service.catalog().get_product(&sku).await.unwrap();
    product.price = Money::from_cents(1_200);
    h.service.catalog().upsert_product(product).await.unwrap();

    let cart = h.service.get_cart(user).await.unwrap();
    let line = cart.item(&sku).unwrap();
    assert_eq!(line.unit_price, Money::from_cents(1_200));
    assert_eq!(cart.total_amount(), Money::from_cents(2_400));
}

#[tokio::test]
async fn clear_cart_empties_it() {
    let h = TestHarness::new();
    let sku = h.product("SKU-001", 1_000, 10).await;
    let user = h.user_with_cart(&[(&sku, 2)]).await;

    let cart = h.service.clear_cart(user).await.unwrap();

    assert!(cart.is_empty());
    assert_eq!(cart.total_amount(), Money::zero());
    assert!(h.service.get_cart(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn cart_mutations_survive_a_lost_race() {
    let h = TestHarness::new();
    let sku = h.product("SKU-001", 1_000, 10).await;
    let user = h.user_with_cart(&[(&sku, 1)]).await;

    h.store.inject_conflicts(2);
    let cart = h.service.add_cart_item(user, &sku, 1).await.unwrap();

    assert_eq!(cart.item(&sku).unwrap().quantity, 2);
}
