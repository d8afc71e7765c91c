//! Cart line items.

use common::ProductId;
use serde::{Deserialize, Serialize};

use super::CartError;
use crate::Money;

/// One product line in a cart.
///
/// `unit_price` is a snapshot of the product's effective price when the line
/// was added or last refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

impl CartItem {
    /// Creates a line with its total derived from price and quantity.
    pub fn new(
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, CartError> {
        let total_price = line_total(&product_id, quantity, unit_price)?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            total_price,
        })
    }

    /// Leaves the line unchanged on error.
    pub(crate) fn set_quantity(&mut self, quantity: u32) -> Result<(), CartError> {
        self.total_price = line_total(&self.product_id, quantity, self.unit_price)?;
        self.quantity = quantity;
        Ok(())
    }

    /// Leaves the line unchanged on error.
    pub(crate) fn set_unit_price(&mut self, unit_price: Money) -> Result<(), CartError> {
        self.total_price = line_total(&self.product_id, self.quantity, unit_price)?;
        self.unit_price = unit_price;
        Ok(())
    }
}

fn line_total(
    product_id: &ProductId,
    quantity: u32,
    unit_price: Money,
) -> Result<Money, CartError> {
    unit_price
        .checked_multiply(quantity)
        .ok_or_else(|| CartError::AmountOverflow {
            product_id: product_id.clone(),
        })
}
