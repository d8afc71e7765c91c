//! Product pricing policy.
//!
//! Products are owned by the catalog; the engine reads their pricing fields
//! and mutates only `inventory`.

use chrono::{DateTime, Utc};
use common::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Aggregate, Money};

/// Errors raised by product validation and inventory changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Invalid price for {product_id}: {price} (must be greater than 0)")]
    InvalidPrice { product_id: ProductId, price: Money },

    #[error("Invalid discount percentage for {product_id}: {percentage} (must be 0-100)")]
    InvalidDiscountPercentage { product_id: ProductId, percentage: u8 },

    #[error("Discount price {discount_price} for {product_id} exceeds list price {price}")]
    DiscountAbovePrice {
        product_id: ProductId,
        price: Money,
        discount_price: Money,
    },

    #[error("Sale window for {product_id} ends before it starts")]
    InvalidSaleWindow { product_id: ProductId },

    #[error("Negative inventory for {product_id}: {inventory}")]
    NegativeInventory { product_id: ProductId, inventory: i64 },

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },
}

/// A catalog product as seen by the fulfillment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,

    /// List price.
    pub price: Money,

    /// Units in stock.
    pub inventory: i64,

    pub is_on_sale: bool,

    /// Fixed sale price, preferred over `discount_percentage` when set.
    pub discount_price: Option<Money>,

    /// Percentage off the list price (0-100).
    pub discount_percentage: Option<u8>,

    /// Sale window bounds; an absent bound is open-ended.
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
}

impl Product {
    /// Creates a product that is not on sale.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        inventory: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            inventory,
            is_on_sale: false,
            discount_price: None,
            discount_percentage: None,
            sale_start: None,
            sale_end: None,
        }
    }

    /// Puts the product on sale at a fixed price.
    pub fn with_discount_price(mut self, discount_price: Money) -> Self {
        self.is_on_sale = true;
        self.discount_price = Some(discount_price);
        self
    }

    /// Puts the product on sale at a percentage off.
    pub fn with_discount_percentage(mut self, percentage: u8) -> Self {
        self.is_on_sale = true;
        self.discount_percentage = Some(percentage);
        self
    }

    /// Limits the sale to a time window.
    pub fn with_sale_window(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.sale_start = start;
        self.sale_end = end;
        self
    }

    /// Returns the price a buyer pays.
    ///
    /// The sale window is not consulted here; combine with
    /// [`is_currently_on_sale`](Self::is_currently_on_sale) for a window-gated price.
    pub fn effective_price(&self) -> Money {
        if !self.is_on_sale {
            return self.price;
        }

        if let Some(discount_price) = self.discount_price {
            return discount_price;
        }

        match self.discount_percentage {
            Some(percentage) if percentage > 0 => {
                self.price - self.price.percent_of(Decimal::from(percentage))
            }
            _ => self.price,
        }
    }

    /// Returns the list price minus the effective price, never negative.
    pub fn savings(&self) -> Money {
        (self.price - self.effective_price()).floor_at_zero()
    }

    /// Returns true if the sale flag is set and `now` is inside the sale window.
    pub fn is_currently_on_sale(&self, now: DateTime<Utc>) -> bool {
        if !self.is_on_sale {
            return false;
        }
        if let Some(start) = self.sale_start
            && now < start
        {
            return false;
        }
        if let Some(end) = self.sale_end
            && now > end
        {
            return false;
        }
        true
    }

    /// Returns the derived pricing fields for display.
    pub fn pricing_view(&self, now: DateTime<Utc>) -> PricingView {
        PricingView {
            product_id: self.id.clone(),
            list_price: self.price,
            effective_price: self.effective_price(),
            savings: self.savings(),
            currently_on_sale: self.is_currently_on_sale(now),
        }
    }

    /// Checks the catalog fields the engine relies on.
    pub fn validate(&self) -> Result<(), PricingError> {
        if !self.price.is_positive() {
            return Err(PricingError::InvalidPrice {
                product_id: self.id.clone(),
                price: self.price,
            });
        }
        if self.inventory < 0 {
            return Err(PricingError::NegativeInventory {
                product_id: self.id.clone(),
                inventory: self.inventory,
            });
        }
        if let Some(percentage) = self.discount_percentage
            && percentage > 100
        {
            return Err(PricingError::InvalidDiscountPercentage {
                product_id: self.id.clone(),
                percentage,
            });
        }
        if let Some(discount_price) = self.discount_price
            && (discount_price > self.price || discount_price.is_negative())
        {
            return Err(PricingError::DiscountAbovePrice {
                product_id: self.id.clone(),
                price: self.price,
                discount_price,
            });
        }
        if let (Some(start), Some(end)) = (self.sale_start, self.sale_end)
            && end < start
        {
            return Err(PricingError::InvalidSaleWindow {
                product_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Returns true if `quantity` units can be taken from stock.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.inventory >= i64::from(quantity)
    }

    /// Removes `quantity` units from stock.
    pub fn debit(&mut self, quantity: u32) -> Result<(), PricingError> {
        if !self.has_stock(quantity) {
            return Err(PricingError::InsufficientStock {
                product_id: self.id.clone(),
                requested: quantity,
                available: self.inventory,
            });
        }
        self.inventory -= i64::from(quantity);
        Ok(())
    }

    /// Returns `quantity` units to stock.
    pub fn credit(&mut self, quantity: u32) {
        self.inventory += i64::from(quantity);
    }
}

impl Aggregate for Product {
    fn collection() -> &'static str {
        "products"
    }

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

/// Pricing fields derived from a product at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingView {
    pub product_id: ProductId,
    pub list_price: Money,
    pub effective_price: Money,
    pub savings: Money,
    pub currently_on_sale: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn widget(price_cents: i64) -> Product {
        Product::new("SKU-001", "Widget", Money::from_cents(price_cents), 10)
    }

    #[test]
    fn not_on_sale_uses_list_price() {
        let product = widget(10000);
        assert_eq!(product.effective_price(), Money::from_units(100));
        assert_eq!(product.savings(), Money::zero());
        assert!(!product.is_currently_on_sale(now()));
    }

    #[test]
    fn discount_price_wins_over_percentage() {
        let mut product = widget(10000).with_discount_price(Money::from_units(70));
        product.discount_percentage = Some(50);

        assert_eq!(product.effective_price(), Money::from_units(70));
        assert_eq!(product.savings(), Money::from_units(30));
    }

    #[test]
    fn percentage_discount_rounds_to_cents() {
        // 15% of 19.99 is 2.9985, rounded to 3.00
        let product = widget(1999).with_discount_percentage(15);
        assert_eq!(product.effective_price(), Money::from_cents(1699));
    }

    #[test]
    fn zero_percentage_is_list_price() {
        let product = widget(1999).with_discount_percentage(0);
        assert_eq!(product.effective_price(), Money::from_cents(1999));
    }

    #[test]
    fn on_sale_without_discount_fields_is_list_price() {
        let mut product = widget(1999);
        product.is_on_sale = true;
        assert_eq!(product.effective_price(), product.price);
    }

    #[test]
    fn effective_price_never_exceeds_list_price() {
        for percentage in [0u8, 1, 13, 33, 50, 99, 100] {
            for cents in [1i64, 99, 1999, 10001] {
                let product = widget(cents).with_discount_percentage(percentage);
                assert!(product.effective_price() <= product.price);
                assert!(!product.effective_price().is_negative());
            }
        }
    }

    #[test]
    fn sale_window_gates_flag_but_not_price() {
        let product = widget(10000)
            .with_discount_percentage(25)
            .with_sale_window(Some(now() + Duration::days(1)), Some(now() + Duration::days(2)));

        assert!(!product.is_currently_on_sale(now()));
        assert!(product.is_currently_on_sale(now() + Duration::days(1)));
        assert!(product.is_currently_on_sale(now() + Duration::days(2)));
        assert!(!product.is_currently_on_sale(now() + Duration::days(3)));
        assert_eq!(product.effective_price(), Money::from_units(75));
    }

    #[test]
    fn open_ended_window() {
        let product = widget(10000)
            .with_discount_percentage(10)
            .with_sale_window(None, Some(now()));

        assert!(product.is_currently_on_sale(now() - Duration::days(365)));
        assert!(!product.is_currently_on_sale(now() + Duration::seconds(1)));
    }

    #[test]
    fn pricing_view() {
        let view = widget(5000).with_discount_price(Money::from_units(40)).pricing_view(now());

        assert_eq!(view.list_price, Money::from_units(50));
        assert_eq!(view.effective_price, Money::from_units(40));
        assert_eq!(view.savings, Money::from_units(10));
        assert!(view.currently_on_sale);
    }

    #[test]
    fn validate_rejects_bad_fields() {
        assert!(widget(1000).validate().is_ok());
        assert!(matches!(
            widget(0).validate(),
            Err(PricingError::InvalidPrice { .. })
        ));
        assert!(matches!(
            widget(1000).with_discount_percentage(101).validate(),
            Err(PricingError::InvalidDiscountPercentage { percentage: 101, .. })
        ));
        assert!(matches!(
            widget(1000).with_discount_price(Money::from_units(11)).validate(),
            Err(PricingError::DiscountAbovePrice { .. })
        ));
        assert!(matches!(
            widget(1000)
                .with_sale_window(Some(now()), Some(now() - Duration::hours(1)))
                .validate(),
            Err(PricingError::InvalidSaleWindow { .. })
        ));

        let mut negative = widget(1000);
        negative.inventory = -1;
        assert!(matches!(
            negative.validate(),
            Err(PricingError::NegativeInventory { .. })
        ));
    }

    #[test]
    fn debit_and_credit() {
        let mut product = widget(1000);

        product.debit(4).unwrap();
        assert_eq!(product.inventory, 6);

        let err = product.debit(7).unwrap_err();
        assert_eq!(
            err,
            PricingError::InsufficientStock {
                product_id: ProductId::new("SKU-001"),
                requested: 7,
                available: 6,
            }
        );
        assert_eq!(product.inventory, 6);

        product.credit(4);
        assert_eq!(product.inventory, 10);
    }
}
