//! Product records used for pricing and inventory.
//!
//! The catalog itself is owned elsewhere; this seam lets it publish products
//! into the store and lets callers read derived pricing.

use common::ProductId;
use document_store::DocumentStore;
use domain::{PricingView, Product};

use crate::context::Context;
use crate::repository::Loaded;
use crate::{FulfillmentError, Result};

/// Read and publish access to products.
pub struct ProductCatalog<S> {
    ctx: Context<S>,
}

impl<S: DocumentStore> ProductCatalog<S> {
    pub(crate) fn new(ctx: Context<S>) -> Self {
        Self { ctx }
    }

    /// Inserts or replaces a product record.
    ///
    /// Replacement is conditioned on the version read, so an upsert racing a
    /// checkout is retried against the new inventory rather than clobbering it.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn upsert_product(&self, product: Product) -> Result<Product> {
        product.validate()?;
        let product = &product;

        self.ctx
            .config
            .cart_retry()
            .run("upsert_product", |_| async move {
                let current = self.ctx.repo.load::<Product>(&product.id).await?;
                let next = Loaded {
                    value: product.clone(),
                    version: current.map(|c| c.version).unwrap_or_default(),
                };
                Ok(self.ctx.repo.save(next).await?.into_inner())
            })
            .await
    }

    /// Loads a product.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product> {
        self.ctx
            .repo
            .load::<Product>(product_id)
            .await?
            .map(Loaded::into_inner)
            .ok_or_else(|| FulfillmentError::not_found("product", product_id))
    }

    /// Returns effective price, savings and the on-sale flag of a product.
    #[tracing::instrument(skip(self))]
    pub async fn pricing_view(&self, product_id: &ProductId) -> Result<PricingView> {
        let product = self.get_product(product_id).await?;
        Ok(product.pricing_view(self.ctx.now()))
    }

    /// Lists every product, ordered by id.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.ctx.repo.list_all().await
    }

    /// Lists products inside their sale window right now.
    #[tracing::instrument(skip(self))]
    pub async fn list_on_sale(&self) -> Result<Vec<Product>> {
        let now = self.ctx.now();
        let mut products = self.list_products().await?;
        products.retain(|product| product.is_currently_on_sale(now));
        Ok(products)
    }
}
