//! Coupon administration and previews.

use document_store::{DocumentQuery, DocumentStore};
use domain::{Aggregate, Coupon, CouponType, CouponUpdate, Money};

use crate::context::Context;
use crate::repository::Loaded;
use crate::{FulfillmentError, Result};

/// Service for managing coupons outside of checkout.
///
/// Nothing here consumes a use; that only happens inside a committed checkout.
/// Coupons are never deleted because committed orders keep their code;
/// [`deactivate`](Self::deactivate) retires one instead.
pub struct CouponService<S> {
    ctx: Context<S>,
}

impl<S: DocumentStore> CouponService<S> {
    pub(crate) fn new(ctx: Context<S>) -> Self {
        Self { ctx }
    }

    /// Stores a new coupon. Codes are unique.
    #[tracing::instrument(skip(self, coupon), fields(code = %coupon.code))]
    pub async fn create_coupon(&self, coupon: Coupon) -> Result<Coupon> {
        coupon.validate()?;
        let code = coupon.code.clone();

        match self.ctx.repo.save(Loaded::fresh(coupon)).await {
            Ok(saved) => {
                tracing::info!(%code, "coupon created");
                Ok(saved.into_inner())
            }
            Err(err) if err.is_retryable() => Err(FulfillmentError::InvalidInput(format!(
                "Coupon with code {code} already exists"
            ))),
            Err(err) => Err(err),
        }
    }

    /// Edits an existing coupon. The usage count is kept as stored.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_coupon(&self, code: &str, update: CouponUpdate) -> Result<Coupon> {
        let coupon = self
            .ctx
            .config
            .cart_retry()
            .run("update_coupon", |_| {
                let update = update.clone();
                async move {
                    let mut coupon = self.load(code).await?;
                    coupon.value.apply_update(update)?;
                    Ok(self.ctx.repo.save(coupon).await?.into_inner())
                }
            })
            .await?;

        tracing::info!(code, used_count = coupon.used_count, "coupon updated");
        Ok(coupon)
    }

    /// Loads a coupon by code.
    #[tracing::instrument(skip(self))]
    pub async fn get_coupon(&self, code: &str) -> Result<Coupon> {
        self.load(code).await.map(Loaded::into_inner)
    }

    /// Lists every coupon, ordered by code.
    #[tracing::instrument(skip(self))]
    pub async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        self.ctx.repo.list_all().await
    }

    /// Lists coupons of one marketing category, ordered by code.
    #[tracing::instrument(skip(self))]
    pub async fn list_coupons_by_type(&self, coupon_type: CouponType) -> Result<Vec<Coupon>> {
        let query = DocumentQuery::collection(Coupon::collection())
            .field_equals("coupon_type", serde_json::to_value(coupon_type)?);
        self.ctx.repo.list(query).await
    }

    /// Lists coupons that could be applied right now.
    #[tracing::instrument(skip(self))]
    pub async fn list_valid_coupons(&self) -> Result<Vec<Coupon>> {
        let now = self.ctx.now();
        let mut coupons = self.list_coupons().await?;
        coupons.retain(|coupon| coupon.is_valid(now));
        Ok(coupons)
    }

    /// Marks a coupon inactive so it can no longer be redeemed.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, code: &str) -> Result<Coupon> {
        self.ctx
            .config
            .cart_retry()
            .run("deactivate_coupon", |_| async move {
                let mut coupon = self.load(code).await?;
                coupon.value.deactivate();
                Ok(self.ctx.repo.save(coupon).await?.into_inner())
            })
            .await
    }

    /// Returns true if the coupon exists and would grant a discount on
    /// `order_amount` right now.
    #[tracing::instrument(skip(self))]
    pub async fn validate_coupon(&self, code: &str, order_amount: Money) -> Result<bool> {
        let Some(coupon) = self.ctx.repo.load::<Coupon>(code).await? else {
            return Ok(false);
        };
        Ok(coupon
            .value
            .check_for_amount(order_amount, self.ctx.now())
            .is_ok())
    }

    /// Returns the discount the coupon would grant, without consuming it.
    #[tracing::instrument(skip(self))]
    pub async fn preview_discount(&self, code: &str, order_amount: Money) -> Result<Money> {
        let coupon = self.load(code).await?.into_inner();
        let now = self.ctx.now();

        coupon
            .check_for_amount(order_amount, now)
            .map_err(|reason| FulfillmentError::coupon_rejected(code, reason))?;
        Ok(coupon.calculate_discount(order_amount, now))
    }

    async fn load(&self, code: &str) -> Result<Loaded<Coupon>> {
        self.ctx
            .repo
            .load::<Coupon>(code)
            .await?
            .ok_or_else(|| FulfillmentError::CouponNotFound {
                code: code.to_string(),
            })
    }
}
