//! Shared fixtures for the fulfillment integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::{ProductId, UserId};
use document_store::InMemoryDocumentStore;
use domain::{Coupon, Money, Product};
use fulfillment::{FixedClock, FulfillmentConfig, FulfillmentService, InMemoryUserDirectory};

#[ctor::ctor]
unsafe fn init_test_tracing() {
    fulfillment::init_tracing(&test_config().log_level);
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn test_config() -> FulfillmentConfig {
    FulfillmentConfig {
        checkout_max_attempts: 3,
        cart_max_attempts: 20,
        retry_backoff: Duration::ZERO,
        log_level: "warn".to_string(),
        ..FulfillmentConfig::default()
    }
}

pub struct TestHarness {
    pub service: FulfillmentService<InMemoryDocumentStore>,
    pub store: InMemoryDocumentStore,
    pub users: InMemoryUserDirectory,
    pub clock: FixedClock,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: FulfillmentConfig) -> Self {
        let store = InMemoryDocumentStore::new();
        let users = InMemoryUserDirectory::new();
        let clock = FixedClock::new(start_time());

        let service = FulfillmentService::with_parts(
            store.clone(),
            Arc::new(users.clone()),
            Arc::new(clock.clone()),
            config,
        );

        Self {
            service,
            store,
            users,
            clock,
        }
    }

    pub async fn user(&self) -> UserId {
        self.users.register_new().await
    }

    /// Publishes a product at a list price with the given stock.
    pub async fn product(&self, sku: &str, price_cents: i64, inventory: i64) -> ProductId {
        self.publish(Product::new(
            sku,
            format!("Product {sku}"),
            Money::from_cents(price_cents),
            inventory,
        ))
        .await
    }

    pub async fn publish(&self, product: Product) -> ProductId {
        self.service
            .catalog()
            .upsert_product(product)
            .await
            .unwrap()
            .id
    }

    pub async fn coupon(&self, coupon: Coupon) -> String {
        self.service
            .coupons()
            .create_coupon(coupon)
            .await
            .unwrap()
            .code
    }

    pub async fn inventory(&self, product_id: &ProductId) -> i64 {
        self.service
            .catalog()
            .get_product(product_id)
            .await
            .unwrap()
            .inventory
    }

    pub async fn used_count(&self, code: &str) -> u32 {
        self.service
            .coupons()
            .get_coupon(code)
            .await
            .unwrap()
            .used_count
    }

    /// Registers a user and fills their cart.
    pub async fn user_with_cart(&self, lines: &[(&ProductId, u32)]) -> UserId {
        let user = self.user().await;
        for (product_id, quantity) in lines {
            self.service
                .add_cart_item(user, product_id, *quantity)
                .await
                .unwrap();
        }
        user
    }
}
