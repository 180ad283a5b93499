//! Core types for Cartwheel.
//!
//! This module provides type-safe wrappers for cart domain concepts.

pub mod cart;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod size;

pub use cart::{CartSnapshot, LineItem, LineKey};
pub use id::*;
pub use order::{OrderDraft, OrderLine};
pub use price::{CurrencyCode, Price};
pub use product::{
    CartTotals, DisplayRow, PLACEHOLDER_IMAGE, PLACEHOLDER_NAME, ProductImage, ProductSummary,
    enrich,
};
pub use size::{Quantity, Size, ValidationError};
