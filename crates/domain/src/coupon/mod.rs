//! Coupon policy: validity, discount calculation and usage accounting.

mod kind;

pub use kind::{CouponType, DiscountType};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Aggregate, Money};

/// Why a coupon cannot be applied right now.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon is inactive")]
    Inactive,

    #[error("coupon is not valid until {starts_at}")]
    NotYetStarted { starts_at: DateTime<Utc> },

    #[error("coupon expired at {ended_at}")]
    Expired { ended_at: DateTime<Utc> },

    #[error("coupon usage limit of {limit} has been reached")]
    UsageLimitReached { limit: u32 },

    #[error("order amount {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: Money, minimum: Money },
}

/// Errors that can occur during coupon operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    /// Every allowed use has been taken.
    #[error("Coupon {code} has no uses left")]
    Exhausted { code: String },

    /// The usage counter is at its maximum.
    #[error("Coupon {code} usage count cannot be incremented further")]
    UsageCountOverflow { code: String },

    /// The coupon definition itself is malformed.
    #[error("Invalid coupon {code}: {reason}")]
    InvalidDefinition { code: String, reason: String },
}

/// Administrative edits to an existing coupon. `None` leaves a field as is.
///
/// The code, type, discount type and usage counter are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponUpdate {
    pub description: Option<String>,
    pub discount_value: Option<Decimal>,
    pub min_order_amount: Option<Money>,
    pub max_discount_amount: Option<Option<Money>>,
    pub usage_limit: Option<Option<u32>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

/// A promotional coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Unique redemption code.
    pub code: String,
    pub description: String,
    pub coupon_type: CouponType,
    pub discount_type: DiscountType,

    /// Percent off for `Percentage`, currency amount for `FixedAmount`.
    pub discount_value: Decimal,

    pub min_order_amount: Money,
    pub max_discount_amount: Option<Money>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Coupon {
    /// Creates an active, unlimited percentage-off coupon.
    pub fn percentage(code: impl Into<String>, percent: Decimal) -> Self {
        Self::new(code.into(), DiscountType::Percentage, percent)
    }

    /// Creates an active, unlimited fixed-amount coupon.
    pub fn fixed_amount(code: impl Into<String>, amount: Money) -> Self {
        Self::new(code.into(), DiscountType::FixedAmount, amount.amount())
    }

    fn new(code: String, discount_type: DiscountType, discount_value: Decimal) -> Self {
        Self {
            code,
            description: String::new(),
            coupon_type: CouponType::General,
            discount_type,
            discount_value,
            min_order_amount: Money::zero(),
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            start_date: None,
            end_date: None,
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_type(mut self, coupon_type: CouponType) -> Self {
        self.coupon_type = coupon_type;
        self
    }

    pub fn with_min_order(mut self, minimum: Money) -> Self {
        self.min_order_amount = minimum;
        self
    }

    pub fn with_max_discount(mut self, cap: Money) -> Self {
        self.max_discount_amount = Some(cap);
        self
    }

    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    pub fn with_validity(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Checks activity, the validity window and remaining uses.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if let Some(starts_at) = self.start_date
            && now < starts_at
        {
            return Err(CouponRejection::NotYetStarted { starts_at });
        }
        if let Some(ended_at) = self.end_date
            && now > ended_at
        {
            return Err(CouponRejection::Expired { ended_at });
        }
        if let Some(limit) = self.usage_limit
            && self.used_count >= limit
        {
            return Err(CouponRejection::UsageLimitReached { limit });
        }
        Ok(())
    }

    /// Like [`check`](Self::check), and also enforces the minimum order amount.
    pub fn check_for_amount(
        &self,
        order_amount: Money,
        now: DateTime<Utc>,
    ) -> Result<(), CouponRejection> {
        self.check(now)?;
        if order_amount < self.min_order_amount {
            return Err(CouponRejection::BelowMinimum {
                amount: order_amount,
                minimum: self.min_order_amount,
            });
        }
        Ok(())
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.check(now).is_ok()
    }

    /// Returns the discount this coupon grants on `order_amount`.
    ///
    /// Zero when the coupon is not applicable. Otherwise the raw discount is
    /// capped at `max_discount_amount` and at the order amount itself.
    pub fn calculate_discount(&self, order_amount: Money, now: DateTime<Utc>) -> Money {
        if self.check_for_amount(order_amount, now).is_err() {
            return Money::zero();
        }

        let raw = match self.discount_type {
            DiscountType::Percentage => order_amount.percent_of(self.discount_value),
            DiscountType::FixedAmount => Money::from_decimal(self.discount_value),
        };

        let capped = match self.max_discount_amount {
            Some(cap) => raw.min(cap),
            None => raw,
        };

        capped.min(order_amount).floor_at_zero()
    }

    /// Records one use of the coupon.
    pub fn consume(&mut self) -> Result<(), CouponError> {
        if let Some(limit) = self.usage_limit
            && self.used_count >= limit
        {
            return Err(CouponError::Exhausted {
                code: self.code.clone(),
            });
        }
        self.used_count = self
            .used_count
            .checked_add(1)
            .ok_or_else(|| CouponError::UsageCountOverflow {
                code: self.code.clone(),
            })?;
        Ok(())
    }

    /// Returns how many uses remain, or None if unlimited.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.usage_limit
            .map(|limit| limit.saturating_sub(self.used_count))
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Applies an administrative edit. The coupon is unchanged if the edited
    /// definition fails [`validate`](Self::validate).
    pub fn apply_update(&mut self, update: CouponUpdate) -> Result<(), CouponError> {
        let mut edited = self.clone();
        if let Some(description) = update.description {
            edited.description = description;
        }
        if let Some(value) = update.discount_value {
            edited.discount_value = value;
        }
        if let Some(minimum) = update.min_order_amount {
            edited.min_order_amount = minimum;
        }
        if let Some(cap) = update.max_discount_amount {
            edited.max_discount_amount = cap;
        }
        if let Some(limit) = update.usage_limit {
            edited.usage_limit = limit;
        }
        if let Some(end) = update.end_date {
            edited.end_date = end;
        }
        if let Some(active) = update.is_active {
            edited.is_active = active;
        }

        edited.validate()?;
        *self = edited;
        Ok(())
    }

    /// Checks the coupon definition for administrative creation.
    pub fn validate(&self) -> Result<(), CouponError> {
        let invalid = |reason: &str| -> Result<(), CouponError> {
            Err(CouponError::InvalidDefinition {
                code: self.code.clone(),
                reason: reason.to_string(),
            })
        };

        if self.code.trim().is_empty() {
            return invalid("code must not be empty");
        }
        if self.discount_value.is_sign_negative() {
            return invalid("discount value must not be negative");
        }
        if self.discount_type == DiscountType::Percentage
            && self.discount_value > Decimal::ONE_HUNDRED
        {
            return invalid("percentage discount must not exceed 100");
        }
        if self.min_order_amount.is_negative() {
            return invalid("minimum order amount must not be negative");
        }
        if self.max_discount_amount.is_some_and(|cap| cap.is_negative()) {
            return invalid("maximum discount must not be negative");
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return invalid("end date is before start date");
        }
        Ok(())
    }
}

impl Aggregate for Coupon {
    fn collection() -> &'static str {
        "coupons"
    }

    fn document_id(&self) -> String {
        self.code.clone()
    }
}
