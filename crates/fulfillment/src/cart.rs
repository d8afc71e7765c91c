//! Cart operations.
//!
//! Each mutation reads the cart, applies the change in memory and writes it
//! back conditioned on the version read, so concurrent increments to the
//! same cart are serialized rather than lost.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use document_store::DocumentStore;
use domain::{Cart, Money, Product};

use crate::context::Context;
use crate::repository::Loaded;
use crate::{FulfillmentError, Result};

/// Service for reading and mutating user carts.
pub struct CartService<S> {
    ctx: Context<S>,
}

impl<S: DocumentStore> CartService<S> {
    pub(crate) fn new(ctx: Context<S>) -> Self {
        Self { ctx }
    }

    /// Returns the user's cart with prices refreshed from the catalog.
    ///
    /// Creates the cart on first access. A refresh that changed any price is
    /// persisted.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart> {
        self.ctx.ensure_user(user_id).await?;

        self.ctx
            .config
            .cart_retry()
            .run("get_cart", |_| async move {
                let mut cart = self.load_or_create(user_id).await?;
                let changed = self.refresh(&mut cart.value).await?;

                if changed || cart.is_fresh() {
                    cart = self.ctx.repo.save(cart).await?;
                }
                Ok(cart.into_inner())
            })
            .await
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        ensure_positive(quantity)?;
        self.ctx.ensure_user(user_id).await?;

        self.mutate("add_item", user_id, Some(product_id), |cart, product, now| {
            let product =
                product.ok_or_else(|| FulfillmentError::not_found("product", product_id))?;
            cart.add_item(product, quantity, now)?;
            Ok(())
        })
        .await
    }

    /// Removes a product's line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, product_id: &ProductId) -> Result<Cart> {
        self.ctx.ensure_user(user_id).await?;

        self.mutate("remove_item", user_id, None, |cart, _, now| {
            cart.remove_item(product_id, now)?;
            Ok(())
        })
        .await
    }

    /// Overwrites the quantity of an existing line.
    #[tracing::instrument(skip(self))]
    pub async fn set_item_quantity(
        &self,
        user_id: UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        ensure_positive(quantity)?;
        self.ctx.ensure_user(user_id).await?;

        self.mutate("set_item_quantity", user_id, None, |cart, _, now| {
            cart.set_item_quantity(product_id, quantity, now)?;
            Ok(())
        })
        .await
    }

    /// Removes every line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: UserId) -> Result<Cart> {
        self.ctx.ensure_user(user_id).await?;

        self.mutate("clear_cart", user_id, None, |cart, _, now| {
            cart.clear(now);
            Ok(())
        })
        .await
    }

    /// Returns the cart total at current prices.
    #[tracing::instrument(skip(self))]
    pub async fn cart_total(&self, user_id: UserId) -> Result<Money> {
        Ok(self.get_cart(user_id).await?.total_amount())
    }

    /// Runs `apply` against a fresh read of the cart until the write lands.
    ///
    /// When `product_id` is given the product is re-read on every attempt and
    /// passed to `apply`, or None if it does not exist.
    async fn mutate<F>(
        &self,
        operation: &'static str,
        user_id: UserId,
        product_id: Option<&ProductId>,
        apply: F,
    ) -> Result<Cart>
    where
        F: Fn(&mut Cart, Option<&Product>, DateTime<Utc>) -> Result<()>,
    {
        let apply = &apply;
        let cart = self
            .ctx
            .config
            .cart_retry()
            .run(operation, |_| async move {
                let product = match product_id {
                    Some(id) => self.ctx.repo.load::<Product>(id).await?.map(Loaded::into_inner),
                    None => None,
                };

                let mut cart = self.load_or_create(user_id).await?;
                apply(&mut cart.value, product.as_ref(), self.ctx.now())?;
                Ok(self.ctx.repo.save(cart).await?.into_inner())
            })
            .await?;

        metrics::counter!("cart_mutations_total", "operation" => operation).increment(1);
        tracing::debug!(
            %user_id,
            operation,
            items = cart.item_count(),
            total = %cart.total_amount(),
            "cart updated"
        );
        Ok(cart)
    }

    async fn load_or_create(&self, user_id: UserId) -> Result<Loaded<Cart>> {
        Ok(match self.ctx.repo.load::<Cart>(user_id).await? {
            Some(cart) => cart,
            None => Loaded::fresh(Cart::new(user_id, self.ctx.now())),
        })
    }

    /// Re-snapshots prices; products that no longer exist are left alone.
    async fn refresh(&self, cart: &mut Cart) -> Result<bool> {
        if cart.is_empty() {
            return Ok(false);
        }

        let products = self
            .ctx
            .repo
            .load_many::<Product, _>(cart.product_ids())
            .await?;
        Ok(cart.refresh_prices(
            |id| products.get(id.as_str()).map(|p| p.value.effective_price()),
            self.ctx.now(),
        )?)
    }
}

fn ensure_positive(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(FulfillmentError::InvalidInput(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
