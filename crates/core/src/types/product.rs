//! Catalog product summaries and display enrichment.
//!
//! Products come from the catalog provider and are never stored inside a
//! line item. [`enrich`] joins the two for rendering.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::LineItem;
use super::id::{CartItemId, ProductId};
use super::price::{CurrencyCode, Price};
use super::size::Size;

/// Image shown when a product or its images are not available.
pub const PLACEHOLDER_IMAGE: &str = "assets/placeholder-image.jpg";

/// Name shown while the product has not been loaded.
pub const PLACEHOLDER_NAME: &str = "Loading...";

const PRODUCT_IMAGE_PREFIX: &str = "assets/productImage/";

/// Product image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    #[serde(default)]
    pub id: Option<i32>,
    /// Image file name relative to the product image directory.
    pub url: String,
}

/// Read-only catalog data used to enrich line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl ProductSummary {
    /// Path of the first product image, if any.
    #[must_use]
    pub fn image_path(&self) -> Option<String> {
        self.images
            .first()
            .map(|image| format!("{PRODUCT_IMAGE_PREFIX}{}", image.url))
    }
}

/// A line item joined with its product, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRow {
    pub cart_item_id: Option<CartItemId>,
    pub product_id: ProductId,
    pub size: Size,
    pub size_label: &'static str,
    pub quantity: u32,
    pub name: String,
    pub image: String,
    /// `None` until the product is known.
    pub unit_price: Option<Price>,
    pub line_price: Option<Price>,
    pub stock: Option<u32>,
}

impl DisplayRow {
    /// Whether the cart holds more than the product currently has in stock.
    #[must_use]
    pub fn exceeds_stock(&self) -> bool {
        self.stock.is_some_and(|stock| self.quantity > stock)
    }
}

/// Join line items with product summaries.
///
/// Products missing from `products` (e.g., not loaded yet) produce rows with
/// placeholder name and image and no price. Neither input is modified.
#[must_use]
pub fn enrich(
    items: &[LineItem],
    products: &[ProductSummary],
    currency_code: CurrencyCode,
) -> Vec<DisplayRow> {
    items
        .iter()
        .map(|item| {
            let product = products.iter().find(|p| p.id == item.product_id);
            let quantity = item.quantity.get();
            let unit_price = product.map(|p| Price::new(p.price, currency_code));

            DisplayRow {
                cart_item_id: item.id,
                product_id: item.product_id,
                size: item.size,
                size_label: item.size_label(),
                quantity,
                name: product.map_or_else(|| PLACEHOLDER_NAME.to_string(), |p| p.name.clone()),
                image: product
                    .and_then(ProductSummary::image_path)
                    .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
                unit_price,
                line_price: unit_price
                    .map(|price| Price::new(price.amount * Decimal::from(quantity), currency_code)),
                stock: product.map(|p| p.stock),
            }
        })
        .collect()
}

/// Subtotal, shipping and total for a set of display rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
}

impl CartTotals {
    /// Compute totals. Rows without a known price contribute nothing, and
    /// shipping is only charged when the subtotal is positive.
    #[must_use]
    pub fn compute(rows: &[DisplayRow], shipping_rate: Decimal, currency_code: CurrencyCode) -> Self {
        let subtotal: Decimal = rows
            .iter()
            .filter_map(|row| row.line_price.map(|p| p.amount))
            .sum();
        let shipping = if subtotal > Decimal::ZERO {
            shipping_rate
        } else {
            Decimal::ZERO
        };

        Self {
            subtotal: Price::new(subtotal, currency_code),
            shipping: Price::new(shipping, currency_code),
            total: Price::new(subtotal + shipping, currency_code),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::size::Quantity;

    fn product(id: i32, price: i64, images: &[&str]) -> ProductSummary {
        ProductSummary {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::new(price, 2),
            stock: 4,
            images: images
                .iter()
                .map(|url| ProductImage {
                    id: None,
                    url: (*url).to_string(),
                })
                .collect(),
        }
    }

    fn line(product: i32, size: Size, quantity: i64) -> LineItem {
        LineItem::unsaved(ProductId::new(product), size, Quantity::new(quantity).unwrap())
    }

    #[test]
    fn test_enrich_joins_product_fields() {
        let items = [line(1, Size::Large, 2)];
        let products = [product(1, 1250, &["shirt.jpg", "back.jpg"])];

        let rows = enrich(&items, &products, CurrencyCode::USD);
        let row = &rows[0];

        assert_eq!(row.name, "Product 1");
        assert_eq!(row.image, "assets/productImage/shirt.jpg");
        assert_eq!(row.size_label, "Large");
        assert_eq!(row.unit_price.unwrap().display(), "$12.50");
        assert_eq!(row.line_price.unwrap().display(), "$25.00");
        assert_eq!(row.stock, Some(4));
    }

    #[test]
    fn test_enrich_missing_product_uses_placeholders() {
        let items = [line(7, Size::NoSize, 1)];
        let rows = enrich(&items, &[], CurrencyCode::USD);

        assert_eq!(rows[0].name, PLACEHOLDER_NAME);
        assert_eq!(rows[0].image, PLACEHOLDER_IMAGE);
        assert_eq!(rows[0].size_label, "No Size");
        assert!(rows[0].unit_price.is_none());
    }

    #[test]
    fn test_enrich_product_without_images() {
        let rows = enrich(&[line(1, Size::Small, 1)], &[product(1, 100, &[])], CurrencyCode::USD);
        assert_eq!(rows[0].image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_enrich_leaves_inputs_untouched() {
        let items = vec![line(1, Size::Small, 1)];
        let products = vec![product(1, 100, &["a.jpg"])];
        let (items_before, products_before) = (items.clone(), products.clone());

        let _ = enrich(&items, &products, CurrencyCode::USD);

        assert_eq!(items, items_before);
        assert_eq!(products, products_before);
    }

    #[test]
    fn test_exceeds_stock() {
        let rows = enrich(&[line(1, Size::Small, 5)], &[product(1, 100, &[])], CurrencyCode::USD);
        assert!(rows[0].exceeds_stock());
    }

    #[test]
    fn test_totals_charge_shipping_only_when_non_empty() {
        let rows = enrich(
            &[line(1, Size::Small, 2), line(9, Size::Small, 1)],
            &[product(1, 1000, &[])],
            CurrencyCode::USD,
        );
        let totals = CartTotals::compute(&rows, Decimal::new(6, 0), CurrencyCode::USD);
        assert_eq!(totals.subtotal.display(), "$20.00");
        assert_eq!(totals.shipping.display(), "$6.00");
        assert_eq!(totals.total.display(), "$26.00");

        let empty = CartTotals::compute(&[], Decimal::new(6, 0), CurrencyCode::USD);
        assert_eq!(empty.total.display(), "$0.00");
    }

    #[test]
    fn test_product_summary_deserializes_backend_shape() {
        let json = serde_json::json!({
            "id": 3,
            "name": "Tee",
            "description": "ignored",
            "price": 19.5,
            "categoryId": 1,
            "stock": 12,
            "images": [{"id": 1, "url": "tee.png"}],
            "status": 1,
            "createdAt": "2024-01-01T00:00:00"
        });
        let product: ProductSummary = serde_json::from_value(json).unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Decimal::new(195, 1));
        assert_eq!(product.image_path().unwrap(), "assets/productImage/tee.png");
    }
}
