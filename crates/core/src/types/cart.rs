//! Line items and immutable cart snapshots.
//!
//! A [`CartSnapshot`] is the complete cart at one point in time. Snapshots are
//! never edited in place: every change builds a new one, so a consumer holding
//! an old snapshot keeps seeing exactly what it was handed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::id::{CartItemId, ProductId};
use super::size::{Quantity, Size};

/// Composite identity of a line item. Unique within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: Size,
}

impl LineKey {
    #[must_use]
    pub const fn new(product_id: ProductId, size: Size) -> Self {
        Self { product_id, size }
    }
}

impl std::fmt::Display for LineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.product_id, self.size.code())
    }
}

/// One `(product, size) -> quantity` entry in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Present once the remote store has persisted this line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CartItemId>,
    pub product_id: ProductId,
    pub size: Size,
    pub quantity: Quantity,
}

impl LineItem {
    /// A line that has not been confirmed by the remote store yet.
    #[must_use]
    pub const fn unsaved(product_id: ProductId, size: Size, quantity: Quantity) -> Self {
        Self {
            id: None,
            product_id,
            size,
            quantity,
        }
    }

    /// A line persisted remotely under `id`.
    #[must_use]
    pub const fn persisted(
        id: CartItemId,
        product_id: ProductId,
        size: Size,
        quantity: Quantity,
    ) -> Self {
        Self {
            id: Some(id),
            product_id,
            size,
            quantity,
        }
    }

    #[must_use]
    pub const fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.size)
    }

    /// Display label for the size. Derived, never stored.
    #[must_use]
    pub const fn size_label(&self) -> &'static str {
        self.size.label()
    }
}

/// The complete cart at one point in time.
///
/// Cloning is cheap (the items are shared). At most one item exists per
/// [`LineKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    items: Arc<[LineItem]>,
}

impl CartSnapshot {
    /// The empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from arbitrary items.
    ///
    /// Duplicate keys collapse onto the position of their first occurrence,
    /// keeping the values of the last one.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut out: Vec<LineItem> = Vec::new();
        for item in items {
            match out.iter_mut().find(|existing| existing.key() == item.key()) {
                Some(existing) => *existing = item,
                None => out.push(item),
            }
        }
        Self { items: out.into() }
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: LineKey) -> Option<&LineItem> {
        self.items.iter().find(|item| item.key() == key)
    }

    #[must_use]
    pub fn contains(&self, key: LineKey) -> bool {
        self.get(key).is_some()
    }

    /// Quantity held for a product and size, or 0 when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId, size: Size) -> u32 {
        self.get(LineKey::new(product_id, size))
            .map_or(0, |item| item.quantity.get())
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// New snapshot with `item` replacing the line for its key, or appended
    /// when the key is absent.
    #[must_use]
    pub fn with_upserted(&self, item: LineItem) -> Self {
        let key = item.key();
        if self.contains(key) {
            Self {
                items: self
                    .items
                    .iter()
                    .map(|existing| if existing.key() == key { item } else { *existing })
                    .collect(),
            }
        } else {
            Self {
                items: self.items.iter().copied().chain(Some(item)).collect(),
            }
        }
    }

    /// New snapshot with the quantity of `key` replaced. Absent keys are left
    /// alone.
    #[must_use]
    pub fn with_quantity(&self, key: LineKey, quantity: Quantity) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|item| {
                    if item.key() == key {
                        LineItem { quantity, ..*item }
                    } else {
                        *item
                    }
                })
                .collect(),
        }
    }

    /// New snapshot without the line for `key`.
    #[must_use]
    pub fn without(&self, key: LineKey) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|item| item.key() != key)
                .copied()
                .collect(),
        }
    }
}

impl FromIterator<LineItem> for CartSnapshot {
    fn from_iter<T: IntoIterator<Item = LineItem>>(iter: T) -> Self {
        Self::from_items(iter)
    }
}

impl<'a> IntoIterator for &'a CartSnapshot {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn item(product: i32, size: Size, quantity: i64) -> LineItem {
        LineItem::unsaved(ProductId::new(product), size, qty(quantity))
    }

    #[test]
    fn test_from_items_collapses_duplicate_keys() {
        let snapshot = CartSnapshot::from_items([
            item(1, Size::Small, 1),
            item(2, Size::Large, 2),
            item(1, Size::Small, 5),
        ]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.quantity_of(ProductId::new(1), Size::Small), 5);
        assert_eq!(snapshot.items()[0].product_id, ProductId::new(1));
    }

    #[test]
    fn test_same_product_different_sizes_are_distinct() {
        let snapshot =
            CartSnapshot::from_items([item(1, Size::Small, 1), item(1, Size::Medium, 2)]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.item_count(), 3);
    }

    #[test]
    fn test_with_upserted_replaces_in_place() {
        let original =
            CartSnapshot::from_items([item(1, Size::Small, 1), item(2, Size::Large, 1)]);
        let updated = original.with_upserted(LineItem::persisted(
            CartItemId::new(9),
            ProductId::new(1),
            Size::Small,
            qty(4),
        ));

        assert_eq!(updated.len(), 2);
        assert_eq!(updated.items()[0].quantity.get(), 4);
        assert_eq!(updated.items()[0].id, Some(CartItemId::new(9)));
        // The original is untouched
        assert_eq!(original.items()[0].quantity.get(), 1);
        assert_eq!(original.items()[0].id, None);
    }

    #[test]
    fn test_with_upserted_appends_new_key() {
        let snapshot = CartSnapshot::empty().with_upserted(item(5, Size::Large, 1));
        let snapshot = snapshot.with_upserted(item(6, Size::NoSize, 2));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.items()[1].product_id, ProductId::new(6));
    }

    #[test]
    fn test_with_quantity_ignores_absent_key() {
        let snapshot = CartSnapshot::from_items([item(1, Size::Small, 1)]);
        let same = snapshot.with_quantity(LineKey::new(ProductId::new(2), Size::Small), qty(3));
        assert_eq!(same, snapshot);

        let changed = snapshot.with_quantity(LineKey::new(ProductId::new(1), Size::Small), qty(3));
        assert_eq!(changed.quantity_of(ProductId::new(1), Size::Small), 3);
    }

    #[test]
    fn test_without_removes_only_matching_key() {
        let snapshot =
            CartSnapshot::from_items([item(1, Size::Small, 1), item(1, Size::Medium, 1)]);
        let removed = snapshot.without(LineKey::new(ProductId::new(1), Size::Small));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed.items()[0].size, Size::Medium);
    }

    #[test]
    fn test_quantity_of_absent_is_zero() {
        assert_eq!(
            CartSnapshot::empty().quantity_of(ProductId::new(1), Size::Small),
            0
        );
    }

    #[test]
    fn test_line_item_serde_shape() {
        let json = serde_json::to_value(LineItem::persisted(
            CartItemId::new(3),
            ProductId::new(5),
            Size::Large,
            qty(2),
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 3, "productId": 5, "size": 2, "quantity": 2})
        );
    }
}
