//! Garment sizes and line quantities.
//!
//! Both travel over the wire as plain integers; the types here reject values
//! the backend would never accept before any request is built.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;

/// Caller-side rejection raised before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid size code: {0} (expected 0-8)")]
    InvalidSize(i32),
    #[error("Quantity must be at least 1 (got {0})")]
    QuantityTooLow(i64),
    #[error("Quantity {0} exceeds the supported maximum")]
    QuantityTooHigh(i64),
    #[error("Invalid product id: {0}")]
    InvalidProduct(ProductId),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Garment size.
///
/// Encoded as a small integer on the wire. `NoSize` is the sentinel used for
/// products where sizing does not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Size {
    Small,
    Medium,
    Large,
    XL,
    XXL,
    XXXL,
    XXXXL,
    XXXXXL,
    NoSize,
}

impl Size {
    /// All sizes in wire order.
    pub const ALL: [Self; 9] = [
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::XL,
        Self::XXL,
        Self::XXXL,
        Self::XXXXL,
        Self::XXXXXL,
        Self::NoSize,
    ];

    /// Wire code for this size.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Small => 0,
            Self::Medium => 1,
            Self::Large => 2,
            Self::XL => 3,
            Self::XXL => 4,
            Self::XXXL => 5,
            Self::XXXXL => 6,
            Self::XXXXXL => 7,
            Self::NoSize => 8,
        }
    }

    /// Human-readable label shown next to a line item.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
            Self::XL => "XL",
            Self::XXL => "2XL",
            Self::XXXL => "3XL",
            Self::XXXXL => "4XL",
            Self::XXXXXL => "5XL",
            Self::NoSize => "No Size",
        }
    }

    /// Whether this is an apparel size rather than the "no size" sentinel.
    #[must_use]
    pub const fn is_apparel(self) -> bool {
        !matches!(self, Self::NoSize)
    }
}

impl TryFrom<i32> for Size {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(ValidationError::InvalidSize(code))
    }
}

impl From<Size> for i32 {
    fn from(size: Size) -> Self {
        size.code()
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Quantity of a single line item. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "i64")]
pub struct Quantity(u32);

impl Quantity {
    /// The smallest quantity a line item can hold.
    pub const ONE: Self = Self(1);

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::QuantityTooLow` for values below 1, and
    /// `ValidationError::QuantityTooHigh` for values that do not fit a `u32`.
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if raw < 1 {
            return Err(ValidationError::QuantityTooLow(raw));
        }
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| ValidationError::QuantityTooHigh(raw))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Clamp a requested quantity to the available stock.
    ///
    /// Returns `None` when nothing is in stock. Callers apply this before
    /// handing a quantity to the sync engine.
    #[must_use]
    pub fn clamp_to_stock(self, stock: u32) -> Option<Self> {
        (stock > 0).then(|| Self(self.0.min(stock)))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = ValidationError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
