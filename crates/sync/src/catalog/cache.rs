//! Cache types for catalog responses.

use std::sync::Arc;

use cartwheel_core::ProductSummary;

/// Cache key for catalog data.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<[ProductSummary]>),
}
