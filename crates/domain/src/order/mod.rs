//! Order aggregate and related types.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use state::{OrderStatus, ParseOrderStatusError};
pub use value_objects::{OrderItem, StatusChange, TransitionAction};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order is not in a status that allows the action.
    #[error("Invalid status transition: cannot {action} from {current} status")]
    InvalidTransition {
        current: OrderStatus,
        action: TransitionAction,
    },

    /// An override was requested without a target status.
    #[error("Status override requires a target status")]
    MissingTarget,

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,
}
