//! Facade exposing the fulfillment operations.

use std::sync::Arc;

use common::{OrderId, ProductId, UserId};
use document_store::{DocumentStore, PostgresDocumentStore, StoreError};
use domain::{Cart, Money, Order, OrderStatus};

use crate::context::Context;
use crate::{
    CartService, CheckoutTransaction, Clock, CouponService, FulfillmentConfig, FulfillmentError,
    OrderLifecycle, ProductCatalog, Repository, Result, SystemClock, UserDirectory,
};

/// Entry point for callers such as an HTTP layer.
///
/// Cheap to clone; clones share the same store and collaborators.
pub struct FulfillmentService<S> {
    inner: Arc<Services<S>>,
}

struct Services<S> {
    carts: CartService<S>,
    checkout: CheckoutTransaction<S>,
    lifecycle: OrderLifecycle<S>,
    coupons: CouponService<S>,
    catalog: ProductCatalog<S>,
}

impl<S> Clone for FulfillmentService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DocumentStore + Clone> FulfillmentService<S> {
    /// Creates a service using the system clock and default configuration.
    pub fn new(store: S, users: Arc<dyn UserDirectory>) -> Self {
        Self::with_parts(
            store,
            users,
            Arc::new(SystemClock),
            FulfillmentConfig::default(),
        )
    }

    /// Creates a service from explicit collaborators.
    pub fn with_parts(
        store: S,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        config: FulfillmentConfig,
    ) -> Self {
        let ctx = Context {
            repo: Repository::new(store),
            clock,
            users,
            config,
        };

        Self {
            inner: Arc::new(Services {
                carts: CartService::new(ctx.clone()),
                checkout: CheckoutTransaction::new(ctx.clone()),
                lifecycle: OrderLifecycle::new(ctx.clone()),
                coupons: CouponService::new(ctx.clone()),
                catalog: ProductCatalog::new(ctx),
            }),
        }
    }
}

impl FulfillmentService<PostgresDocumentStore> {
    /// Connects to `config.database_url` and runs the migrations.
    pub async fn connect(
        config: FulfillmentConfig,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        let url = config.database_url.as_deref().ok_or_else(|| {
            FulfillmentError::InvalidInput("DATABASE_URL is not set".to_string())
        })?;

        let store = PostgresDocumentStore::connect(url).await?;
        store.run_migrations().await.map_err(StoreError::from)?;
        tracing::info!("connected to document store");

        Ok(Self::with_parts(store, users, Arc::new(SystemClock), config))
    }
}

impl<S: DocumentStore> FulfillmentService<S> {
    pub fn carts(&self) -> &CartService<S> {
        &self.inner.carts
    }

    pub fn checkout_transaction(&self) -> &CheckoutTransaction<S> {
        &self.inner.checkout
    }

    pub fn lifecycle(&self) -> &OrderLifecycle<S> {
        &self.inner.lifecycle
    }

    pub fn coupons(&self) -> &CouponService<S> {
        &self.inner.coupons
    }

    pub fn catalog(&self) -> &ProductCatalog<S> {
        &self.inner.catalog
    }

    pub async fn add_cart_item(
        &self,
        user_id: UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        self.inner.carts.add_item(user_id, product_id, quantity).await
    }

    pub async fn remove_cart_item(&self, user_id: UserId, product_id: &ProductId) -> Result<Cart> {
        self.inner.carts.remove_item(user_id, product_id).await
    }

    pub async fn set_cart_item_quantity(
        &self,
        user_id: UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        self.inner
            .carts
            .set_item_quantity(user_id, product_id, quantity)
            .await
    }

    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart> {
        self.inner.carts.get_cart(user_id).await
    }

    pub async fn cart_total(&self, user_id: UserId) -> Result<Money> {
        self.inner.carts.cart_total(user_id).await
    }

    pub async fn clear_cart(&self, user_id: UserId) -> Result<Cart> {
        self.inner.carts.clear_cart(user_id).await
    }

    /// Converts the user's cart into a `PENDING` order.
    pub async fn checkout(&self, user_id: UserId, coupon_code: Option<&str>) -> Result<Order> {
        self.inner.checkout.execute(user_id, coupon_code).await
    }

    pub async fn approve_order(&self, order_id: OrderId) -> Result<Order> {
        self.inner.lifecycle.approve(order_id).await
    }

    pub async fn reject_order(&self, order_id: OrderId) -> Result<Order> {
        self.inner.lifecycle.reject(order_id).await
    }

    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        self.inner.lifecycle.cancel(order_id).await
    }

    /// Administrative status override; never restores inventory.
    pub async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        self.inner.lifecycle.set_status(order_id, status).await
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.inner.lifecycle.get_order(order_id).await
    }

    pub async fn list_user_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.inner.lifecycle.list_user_orders(user_id).await
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.inner.lifecycle.list_orders().await
    }
}
