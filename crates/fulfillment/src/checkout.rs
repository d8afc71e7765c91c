//! The cart to order commit.
//!
//! A checkout reads the cart, its products and the coupon, validates
//! everything in memory and then commits one batch containing the new order,
//! every inventory debit, the coupon use and the emptied cart. Every write in
//! the batch is conditioned on the version that was read, so the batch lands
//! whole or not at all. A lost race re-runs the checkout from a fresh read.

use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use document_store::{DocumentStore, WriteBatch};
use domain::{Cart, Coupon, Money, Order, OrderItem, Product};

use crate::context::Context;
use crate::repository::Loaded;
use crate::{FulfillmentError, Result};

/// Converts carts into orders.
pub struct CheckoutTransaction<S> {
    ctx: Context<S>,
}

impl<S: DocumentStore> CheckoutTransaction<S> {
    pub(crate) fn new(ctx: Context<S>) -> Self {
        Self { ctx }
    }

    /// Checks out the user's cart, optionally applying a coupon.
    ///
    /// Produces exactly one `PENDING` order, or fails leaving cart, inventory
    /// and coupon unchanged. The code is trimmed; a blank code means no coupon.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, user_id: UserId, coupon_code: Option<&str>) -> Result<Order> {
        metrics::counter!("checkout_total").increment(1);
        let started = Instant::now();

        let result = self.run(user_id, coupon_code).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id(),
                    %user_id,
                    original = %order.original_amount(),
                    discount = %order.discount_amount(),
                    total = %order.total_amount(),
                    "checkout committed"
                );
            }
            Err(err) => {
                metrics::counter!("checkout_failed", "reason" => err.kind()).increment(1);
                tracing::warn!(%user_id, error = %err, "checkout failed");
            }
        }
        result
    }

    async fn run(&self, user_id: UserId, coupon_code: Option<&str>) -> Result<Order> {
        self.ctx.ensure_user(user_id).await?;
        let coupon_code = coupon_code.map(str::trim).filter(|code| !code.is_empty());

        self.ctx
            .config
            .checkout_retry()
            .run("checkout", |attempt| async move {
                if attempt > 1 {
                    metrics::counter!("checkout_conflict_retries").increment(1);
                }
                self.attempt(user_id, coupon_code).await
            })
            .await
    }

    /// One read-validate-write cycle.
    async fn attempt(&self, user_id: UserId, coupon_code: Option<&str>) -> Result<Order> {
        let now = self.ctx.now();

        // 1. Cart, with prices refreshed against the authoritative catalog
        let mut cart = self
            .ctx
            .repo
            .load::<Cart>(user_id)
            .await?
            .filter(|cart| !cart.value.is_empty())
            .ok_or(FulfillmentError::EmptyCart { user_id })?;

        let mut products = self
            .ctx
            .repo
            .load_many::<Product, _>(cart.value.product_ids())
            .await?;

        cart.value.refresh_prices(
            |id| products.get(id.as_str()).map(|p| p.value.effective_price()),
            now,
        )?;

        // 2. Every product exists and has stock before anything is debited
        for item in cart.value.items() {
            let product = &products
                .get(item.product_id.as_str())
                .ok_or_else(|| FulfillmentError::not_found("product", &item.product_id))?
                .value;
            if !product.has_stock(item.quantity) {
                return Err(FulfillmentError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    requested: item.quantity,
                    available: product.inventory,
                });
            }
        }

        // 3. Amount before discount
        let original_amount = cart.value.total_amount();

        // 4. Coupon
        let coupon = match coupon_code {
            Some(code) => Some(self.redeem(code, original_amount, now).await?),
            None => None,
        };
        let discount_amount = coupon
            .as_ref()
            .map(|(_, discount)| *discount)
            .unwrap_or_default();

        // 5-6. Order with its item snapshot
        let items: Vec<OrderItem> = cart.value.items().map(OrderItem::from).collect();
        let order = Order::place(
            OrderId::new(),
            user_id,
            items,
            discount_amount,
            coupon.as_ref().map(|(c, _)| c.value.code.clone()),
            now,
        )?;

        // 7. Inventory
        for item in order.items() {
            if let Some(product) = products.get_mut(item.product_id.as_str()) {
                product.value.debit(item.quantity)?;
            }
        }

        // 8. Cart
        cart.value.clear(now);

        // 9. One atomic commit
        let mut batch = WriteBatch::new();
        batch.push(Loaded::fresh(order.clone()).stage()?);
        for product in products.values() {
            batch.push(product.stage()?);
        }
        if let Some((coupon, _)) = &coupon {
            batch.push(coupon.stage()?);
        }
        batch.push(cart.stage()?);

        self.ctx.repo.commit(batch).await?;
        Ok(order)
    }

    /// Validates the coupon against the order amount and records one use.
    async fn redeem(
        &self,
        code: &str,
        order_amount: Money,
        now: DateTime<Utc>,
    ) -> Result<(Loaded<Coupon>, Money)> {
        let mut coupon = self
            .ctx
            .repo
            .load::<Coupon>(code)
            .await?
            .ok_or_else(|| FulfillmentError::CouponNotFound {
                code: code.to_string(),
            })?;

        if let Err(reason) = coupon.value.check_for_amount(order_amount, now) {
            tracing::debug!(code, %reason, "coupon rejected");
            return Err(FulfillmentError::coupon_rejected(code, reason));
        }

        let discount = coupon.value.calculate_discount(order_amount, now);
        coupon.value.consume()?;
        Ok((coupon, discount))
    }
}
