//! Domain layer for the order-fulfillment engine.
//!
//! This crate holds the pure business rules, with no I/O:
//! - Pricing policy (effective price, savings, sale window)
//! - Cart aggregate with merge-by-product items and derived totals
//! - Coupon validity and discount calculation
//! - Order aggregate with its status state machine
//! - The [`Aggregate`] trait mapping each aggregate onto a store collection

pub mod aggregate;
pub mod cart;
pub mod coupon;
pub mod money;
pub mod order;
pub mod pricing;

pub use aggregate::Aggregate;
pub use cart::{Cart, CartError, CartItem};
pub use common::{CartId, OrderId, ProductId, UserId};
pub use coupon::{
    Coupon, CouponError, CouponRejection, CouponType, CouponUpdate, DiscountType,
};
pub use money::Money;
pub use order::{
    Order, OrderError, OrderItem, OrderStatus, ParseOrderStatusError, StatusChange,
    TransitionAction,
};
pub use pricing::{PricingError, PricingView, Product};
