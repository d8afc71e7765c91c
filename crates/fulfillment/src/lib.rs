//! Order-fulfillment services.
//!
//! Turns a user's cart into a committed order while protecting inventory and
//! coupon usage, and drives the order through its lifecycle with inventory
//! restoration on cancellation and rejection.
//!
//! Every multi-document change is staged into one [`WriteBatch`] whose writes
//! are conditioned on the versions that were read. A lost race fails the whole
//! batch, and the operation is retried from a fresh read a bounded number of
//! times before surfacing [`FulfillmentError::Conflict`].
//!
//! [`WriteBatch`]: document_store::WriteBatch

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod clock;
pub mod config;
mod context;
pub mod coupons;
pub mod error;
pub mod lifecycle;
pub mod repository;
pub mod retry;
pub mod service;
pub mod telemetry;
pub mod users;

pub use cart::CartService;
pub use catalog::ProductCatalog;
pub use checkout::CheckoutTransaction;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::FulfillmentConfig;
pub use coupons::CouponService;
pub use error::{FulfillmentError, Result};
pub use lifecycle::OrderLifecycle;
pub use repository::{Loaded, Repository};
pub use retry::RetryPolicy;
pub use service::FulfillmentService;
pub use telemetry::init_tracing;
pub use users::{InMemoryUserDirectory, UserDirectory};
