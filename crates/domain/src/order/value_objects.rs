//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::{CartItem, Money};

/// Immutable snapshot of one ordered product at the price charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        }
    }
}

/// The operation that moved an order between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Approve,
    Reject,
    Cancel,

    /// Administrative override outside the state machine.
    Override,
}

impl TransitionAction {
    /// Returns true if the transition puts the order's items back in stock.
    pub fn restores_inventory(&self) -> bool {
        matches!(self, TransitionAction::Reject | TransitionAction::Cancel)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Approve => "approve",
            TransitionAction::Reject => "reject",
            TransitionAction::Cancel => "cancel",
            TransitionAction::Override => "override",
        }
    }
}

impl std::fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
    pub action: TransitionAction,
}
