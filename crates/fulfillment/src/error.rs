//! Fulfillment error types.

use common::{ProductId, UserId};
use document_store::StoreError;
use domain::{
    CartError, CouponError, CouponRejection, OrderError, OrderStatus, ParseOrderStatusError,
    PricingError, TransitionAction,
};
use thiserror::Error;

/// Errors surfaced by the fulfillment services.
///
/// Every failure is per-request and leaves stored state unchanged.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// A cart, order, coupon, product or user does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request itself is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cart for user {user_id} is empty")]
    EmptyCart { user_id: UserId },

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    #[error("Coupon not found: {code}")]
    CouponNotFound { code: String },

    #[error("Coupon {code} cannot be applied: {reason}")]
    CouponInvalid {
        code: String,
        reason: CouponRejection,
    },

    #[error("Coupon {code} has no uses left")]
    CouponExhausted { code: String },

    #[error("Invalid status transition: cannot {action} from {current} status")]
    InvalidTransition {
        current: OrderStatus,
        action: TransitionAction,
    },

    /// Optimistic concurrency kept losing; nothing was written.
    #[error("Concurrent modification, gave up after {attempts} attempts")]
    Conflict { attempts: u32 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FulfillmentError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        FulfillmentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if the operation lost an optimistic-concurrency race and
    /// may succeed when retried from a fresh read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FulfillmentError::Store(err) if err.is_conflict())
    }

    /// Maps a coupon rejection onto the public taxonomy.
    pub fn coupon_rejected(code: &str, reason: CouponRejection) -> Self {
        match reason {
            CouponRejection::UsageLimitReached { .. } => FulfillmentError::CouponExhausted {
                code: code.to_string(),
            },
            reason => FulfillmentError::CouponInvalid {
                code: code.to_string(),
                reason,
            },
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::NotFound { .. } => "not_found",
            FulfillmentError::InvalidInput(_) => "invalid_input",
            FulfillmentError::EmptyCart { .. } => "empty_cart",
            FulfillmentError::InsufficientStock { .. } => "insufficient_stock",
            FulfillmentError::CouponNotFound { .. } => "coupon_not_found",
            FulfillmentError::CouponInvalid { .. } => "coupon_invalid",
            FulfillmentError::CouponExhausted { .. } => "coupon_exhausted",
            FulfillmentError::InvalidTransition { .. } => "invalid_transition",
            FulfillmentError::Conflict { .. } => "conflict",
            FulfillmentError::Store(_) => "store",
            FulfillmentError::Serialization(_) => "serialization",
        }
    }
}

impl From<CartError> for FulfillmentError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound { product_id } => {
                FulfillmentError::not_found("cart item", product_id)
            }
            other => FulfillmentError::InvalidInput(other.to_string()),
        }
    }
}

impl From<CouponError> for FulfillmentError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::Exhausted { code } => FulfillmentError::CouponExhausted { code },
            other => FulfillmentError::InvalidInput(other.to_string()),
        }
    }
}

impl From<OrderError> for FulfillmentError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { current, action } => {
                FulfillmentError::InvalidTransition { current, action }
            }
            other => FulfillmentError::InvalidInput(other.to_string()),
        }
    }
}

impl From<PricingError> for FulfillmentError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InsufficientStock {
                product_id,
                requested,
                available,
            } => FulfillmentError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => FulfillmentError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ParseOrderStatusError> for FulfillmentError {
    fn from(err: ParseOrderStatusError) -> Self {
        FulfillmentError::InvalidInput(err.to_string())
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
