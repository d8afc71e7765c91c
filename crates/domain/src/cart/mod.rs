//! Cart aggregate.
//!
//! A user owns exactly one cart. Items are keyed by product so adding the
//! same product twice merges into one line, and `total_amount` is recomputed
//! from the lines after every mutation.

mod item;

pub use item::CartItem;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{CartId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Aggregate, Money, Product};

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Merging would overflow the line quantity.
    #[error("Quantity for {product_id} would exceed the maximum of {max}", max = u32::MAX)]
    QuantityOverflow { product_id: ProductId },

    /// A line or cart total would not fit in a money amount.
    #[error("Amount for {product_id} exceeds the supported range")]
    AmountOverflow { product_id: ProductId },

    /// No line for this product.
    #[error("Item not found in cart: {product_id}")]
    ItemNotFound { product_id: ProductId },
}

/// A user's shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    user_id: UserId,
    items: BTreeMap<ProductId, CartItem>,
    total_amount: Money,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            items: BTreeMap::new(),
            total_amount: Money::zero(),
            updated_at: now,
        }
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the lines ordered by product id.
    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.values()
    }

    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.get(product_id)
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &ProductId> {
        self.items.keys()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Adds `quantity` units of a product.
    ///
    /// An existing line keeps its price snapshot and has its quantity
    /// increased; a new line snapshots the product's effective price.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<&CartItem, CartError> {
        ensure_positive(quantity)?;

        let item = match self.items.get(&product.id) {
            Some(existing) => {
                let merged = existing.quantity.checked_add(quantity).ok_or_else(|| {
                    CartError::QuantityOverflow {
                        product_id: product.id.clone(),
                    }
                })?;
                let mut item = existing.clone();
                item.set_quantity(merged)?;
                item
            }
            None => CartItem::new(product.id.clone(), quantity, product.effective_price())?,
        };

        self.put(item, now)
    }

    /// Removes the line for a product.
    pub fn remove_item(
        &mut self,
        product_id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<CartItem, CartError> {
        if !self.items.contains_key(product_id) {
            return Err(CartError::ItemNotFound {
                product_id: product_id.clone(),
            });
        }
        let total = total_of(self.items.values().filter(|item| &item.product_id != product_id))?;

        let removed = self
            .items
            .remove(product_id)
            .ok_or_else(|| CartError::ItemNotFound {
                product_id: product_id.clone(),
            })?;
        self.total_amount = total;
        self.updated_at = now;
        Ok(removed)
    }

    /// Overwrites the quantity of an existing line.
    pub fn set_item_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<&CartItem, CartError> {
        ensure_positive(quantity)?;

        let mut item = self
            .items
            .get(product_id)
            .ok_or_else(|| CartError::ItemNotFound {
                product_id: product_id.clone(),
            })?
            .clone();
        item.set_quantity(quantity)?;

        self.put(item, now)
    }

    /// Re-snapshots unit prices from the current catalog.
    ///
    /// `current_price` returns the effective price of a product, or None if
    /// the product no longer exists; such lines are left untouched.
    /// Returns true if any line changed. On error the cart is unchanged.
    pub fn refresh_prices<F>(
        &mut self,
        mut current_price: F,
        now: DateTime<Utc>,
    ) -> Result<bool, CartError>
    where
        F: FnMut(&ProductId) -> Option<Money>,
    {
        let mut items = self.items.clone();
        let mut changed = false;
        for item in items.values_mut() {
            if let Some(price) = current_price(&item.product_id)
                && price != item.unit_price
            {
                item.set_unit_price(price)?;
                changed = true;
            }
        }

        if changed {
            self.total_amount = total_of(items.values())?;
            self.items = items;
            self.updated_at = now;
        }
        Ok(changed)
    }

    /// Removes every line.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.total_amount = Money::zero();
        self.updated_at = now;
    }

    /// Inserts or replaces a line, keeping the cart untouched if the new
    /// total would overflow.
    fn put(&mut self, item: CartItem, now: DateTime<Utc>) -> Result<&CartItem, CartError> {
        let total = total_of(
            self.items
                .values()
                .filter(|line| line.product_id != item.product_id)
                .chain(std::iter::once(&item)),
        )?;

        let product_id = item.product_id.clone();
        self.items.insert(product_id.clone(), item);
        self.total_amount = total;
        self.updated_at = now;
        self.items
            .get(&product_id)
            .ok_or(CartError::ItemNotFound { product_id })
    }
}

impl Aggregate for Cart {
    fn collection() -> &'static str {
        "carts"
    }

    /// Carts are addressed by their owner.
    fn document_id(&self) -> String {
        self.user_id.to_string()
    }
}

fn total_of<'a>(items: impl IntoIterator<Item = &'a CartItem>) -> Result<Money, CartError> {
    items.into_iter().try_fold(Money::zero(), |total, item| {
        total
            .checked_add(item.total_price)
            .ok_or_else(|| CartError::AmountOverflow {
                product_id: item.product_id.clone(),
            })
    })
}

fn ensure_positive(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 {
        return Err(CartError::InvalidQuantity { quantity });
    }
    Ok(())
}
