//! Order status transitions and order queries.
//!
//! Rejecting or cancelling an order puts its items back in stock. The status
//! change and every inventory credit are committed in one batch.

use common::{OrderId, UserId};
use document_store::{DocumentQuery, DocumentStore, WriteBatch};
use domain::{Aggregate, Order, OrderStatus, Product, TransitionAction};

use crate::context::Context;
use crate::repository::Loaded;
use crate::{FulfillmentError, Result};

/// Drives orders through their lifecycle.
pub struct OrderLifecycle<S> {
    ctx: Context<S>,
}

impl<S: DocumentStore> OrderLifecycle<S> {
    pub(crate) fn new(ctx: Context<S>) -> Self {
        Self { ctx }
    }

    /// `PENDING` to `CONFIRMED`. Inventory is not touched.
    #[tracing::instrument(skip(self))]
    pub async fn approve(&self, order_id: OrderId) -> Result<Order> {
        self.transition(order_id, TransitionAction::Approve, None).await
    }

    /// `PENDING` to `CANCELLED`, restoring inventory.
    #[tracing::instrument(skip(self))]
    pub async fn reject(&self, order_id: OrderId) -> Result<Order> {
        self.transition(order_id, TransitionAction::Reject, None).await
    }

    /// `PENDING` or `CONFIRMED` to `CANCELLED`, restoring inventory.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order> {
        self.transition(order_id, TransitionAction::Cancel, None).await
    }

    /// Administrative override to any status.
    ///
    /// Bypasses the state machine and never restores inventory.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        self.transition(order_id, TransitionAction::Override, Some(status))
            .await
    }

    /// Like [`set_status`](Self::set_status), parsing the status name
    /// case-insensitively.
    #[tracing::instrument(skip(self))]
    pub async fn set_status_named(&self, order_id: OrderId, status: &str) -> Result<Order> {
        let status: OrderStatus = status.parse()?;
        self.set_status(order_id, status).await
    }

    /// Loads an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.ctx
            .repo
            .load::<Order>(order_id)
            .await?
            .map(Loaded::into_inner)
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))
    }

    /// Lists a user's orders, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_user_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        let query = DocumentQuery::collection(Order::collection())
            .field_equals("user_id", serde_json::to_value(user_id)?);
        let mut orders: Vec<Order> = self.ctx.repo.list(query).await?;
        orders.sort_by_key(|order| order.order_date());
        Ok(orders)
    }

    /// Lists every order, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.ctx.repo.list_all().await?;
        orders.sort_by_key(|order| order.order_date());
        Ok(orders)
    }

    async fn transition(
        &self,
        order_id: OrderId,
        action: TransitionAction,
        target: Option<OrderStatus>,
    ) -> Result<Order> {
        let order = self
            .ctx
            .config
            .checkout_retry()
            .run(action.as_str(), |_| async move {
                self.attempt(order_id, action, target).await
            })
            .await?;

        metrics::counter!("order_transitions_total", "action" => action.as_str()).increment(1);
        tracing::info!(%order_id, %action, status = %order.status(), "order status changed");
        Ok(order)
    }

    async fn attempt(
        &self,
        order_id: OrderId,
        action: TransitionAction,
        target: Option<OrderStatus>,
    ) -> Result<Order> {
        let mut order = self
            .ctx
            .repo
            .load::<Order>(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))?;

        order
            .value
            .transition(action, target, self.ctx.now())?;

        let mut batch = WriteBatch::new();
        batch.push(order.stage()?);

        if action.restores_inventory() {
            let mut products = self
                .ctx
                .repo
                .load_many::<Product, _>(order.value.items().iter().map(|item| &item.product_id))
                .await?;

            for item in order.value.items() {
                let product = products
                    .get_mut(item.product_id.as_str())
                    .ok_or_else(|| FulfillmentError::not_found("product", &item.product_id))?;
                product.value.credit(item.quantity);
            }
            for product in products.values() {
                batch.push(product.stage()?);
            }
        }

        self.ctx.repo.commit(batch).await?;
        Ok(order.into_inner())
    }
}
