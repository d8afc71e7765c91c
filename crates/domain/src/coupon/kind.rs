use serde::{Deserialize, Serialize};

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// Percent off the order amount.
    Percentage,

    /// Fixed currency amount off.
    FixedAmount,
}

/// Marketing category of a coupon. Carried as data; it does not change pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponType {
    Welcome,
    FlashSale,
    Student,
    MegaDiscount,
    CategorySpecific,
    #[default]
    General,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "PERCENTAGE",
            DiscountType::FixedAmount => "FIXED_AMOUNT",
        }
    }
}

impl CouponType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponType::Welcome => "WELCOME",
            CouponType::FlashSale => "FLASH_SALE",
            CouponType::Student => "STUDENT",
            CouponType::MegaDiscount => "MEGA_DISCOUNT",
            CouponType::CategorySpecific => "CATEGORY_SPECIFIC",
            CouponType::General => "GENERAL",
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for CouponType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
