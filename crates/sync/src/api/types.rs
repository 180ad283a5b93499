//! Wire types for the remote cart API.
//!
//! These mirror the backend's JSON exactly. Conversion into domain types
//! happens here so the engine only ever sees validated line items.

use cartwheel_core::{
    CartId, CartItemId, CartSnapshot, LineItem, ProductId, Quantity, Size, UserId,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub status: bool,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// Body of `POST /Cart/AddToCartAsync`.
///
/// `id` is always 0: the server resolves identity from the
/// `(productId, size)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub id: i32,
    pub product_id: ProductId,
    pub size: Size,
    pub quantity: Quantity,
}

impl UpsertRequest {
    #[must_use]
    pub const fn new(product_id: ProductId, size: Size, quantity: Quantity) -> Self {
        Self {
            id: 0,
            product_id,
            size,
            quantity,
        }
    }
}

/// The part of an upsert response the engine relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CartItemRecord {
    pub id: CartItemId,
}

/// Payload of `GET /Cart/GetMyCart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCart {
    #[serde(default)]
    pub id: Option<CartId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
}

/// A cart line exactly as the backend reports it.
///
/// Sizes and quantities are kept raw so one bad line cannot fail the whole
/// cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartItem {
    #[serde(default)]
    pub id: Option<CartItemId>,
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<i32>,
}

impl TryFrom<RemoteCartItem> for LineItem {
    type Error = cartwheel_core::ValidationError;

    fn try_from(item: RemoteCartItem) -> Result<Self, Self::Error> {
        if !item.product_id.is_valid() {
            return Err(cartwheel_core::ValidationError::InvalidProduct(
                item.product_id,
            ));
        }
        let size = item
            .size
            .ok_or(cartwheel_core::ValidationError::InvalidSize(-1))
            .and_then(Size::try_from)?;
        let quantity = Quantity::new(item.quantity)?;

        Ok(Self {
            id: item.id,
            product_id: item.product_id,
            size,
            quantity,
        })
    }
}

impl RemoteCart {
    /// Convert into a snapshot, dropping lines that cannot exist locally.
    #[must_use]
    pub fn into_snapshot(self) -> CartSnapshot {
        self.items
            .into_iter()
            .filter_map(|raw| match LineItem::try_from(raw) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(
                        product_id = %raw.product_id,
                        cart_item_id = ?raw.id,
                        error = %e,
                        "Dropping invalid cart line from server"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Routes the backend may expose for clearing the cart, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearRoute {
    /// `DELETE /Cart/clear`
    Canonical,
    /// `DELETE /Cart/ClearCart`
    ClearCart,
    /// `DELETE /Cart/Clear`
    Clear,
    /// `DELETE /Cart/ClearMyCart`
    ClearMyCart,
}

impl ClearRoute {
    /// Alternate routes, tried after the canonical one.
    pub const FALLBACKS: [Self; 3] = [Self::ClearCart, Self::Clear, Self::ClearMyCart];

    /// Path relative to the API base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Canonical => "Cart/clear",
            Self::ClearCart => "Cart/ClearCart",
            Self::Clear => "Cart/Clear",
            Self::ClearMyCart => "Cart/ClearMyCart",
        }
    }

    /// Candidate list for a clear request.
    #[must_use]
    pub fn candidates(with_fallbacks: bool) -> Vec<Self> {
        let mut routes = vec![Self::Canonical];
        if with_fallbacks {
            routes.extend(Self::FALLBACKS);
        }
        routes
    }
}

impl std::fmt::Display for ClearRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Accept both RFC 3339 timestamps and the offset-less form the backend
/// emits (`2024-05-01T12:34:56.789`), which is taken as UTC. Anything else
/// decodes as `None`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    match NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Ok(Some(naive.and_utc())),
        Err(e) => {
            tracing::warn!(value = %raw, error = %e, "Ignoring unrecognized cart timestamp");
            Ok(None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_upsert_request_wire_shape() {
        let request = UpsertRequest::new(ProductId::new(5), Size::Large, Quantity::new(3).unwrap());
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            serde_json::json!({"id": 0, "productId": 5, "size": 2, "quantity": 3})
        );
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: ApiEnvelope<CartItemRecord> =
            serde_json::from_str(r#"{"status": false, "message": "Out of stock"}"#).unwrap();
        assert!(!envelope.status);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("Out of stock"));
    }

    #[test]
    fn test_remote_cart_parses_backend_payload() {
        let json = serde_json::json!({
            "id": 1,
            "userId": 4,
            "createdAt": "2024-05-01T12:34:56.789",
            "items": [
                {"id": 10, "productId": 5, "quantity": 2, "size": 2, "product": null},
                {"id": 11, "productId": 6, "quantity": 1, "size": 8}
            ]
        });
        let cart: RemoteCart = serde_json::from_value(json).unwrap();
        let created = cart.created_at.unwrap();
        assert_eq!((created.year(), created.hour()), (2024, 12));

        let snapshot = cart.into_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.items()[0].id, Some(CartItemId::new(10)));
        assert_eq!(snapshot.items()[1].size, Size::NoSize);
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let cart: RemoteCart =
            serde_json::from_value(serde_json::json!({"createdAt": "2024-05-01T10:00:00+02:00"}))
                .unwrap();
        assert_eq!(cart.created_at.unwrap().hour(), 8);
    }

    #[test]
    fn test_unrecognized_timestamp_keeps_cart() {
        let json = serde_json::json!({
            "createdAt": "2024-05-01 12:34:56",
            "items": [{"id": 10, "productId": 5, "quantity": 2, "size": 2}]
        });
        let cart: RemoteCart = serde_json::from_value(json).unwrap();
        assert!(cart.created_at.is_none());
        assert_eq!(cart.into_snapshot().len(), 1);
    }

    #[test]
    fn test_invalid_lines_are_dropped() {
        let json = serde_json::json!({
            "items": [
                {"id": 1, "productId": 5, "quantity": 0, "size": 2},
                {"id": 2, "productId": 5, "quantity": 1, "size": 42},
                {"id": 3, "productId": 0, "quantity": 1, "size": 1},
                {"id": 4, "productId": 7, "quantity": 1},
                {"id": 5, "productId": 9, "quantity": 1, "size": 1}
            ]
        });
        let cart: RemoteCart = serde_json::from_value(json).unwrap();
        let snapshot = cart.into_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.items()[0].id, Some(CartItemId::new(5)));
    }

    #[test]
    fn test_duplicate_server_lines_collapse() {
        let json = serde_json::json!({
            "items": [
                {"id": 1, "productId": 5, "quantity": 1, "size": 2},
                {"id": 2, "productId": 5, "quantity": 4, "size": 2}
            ]
        });
        let cart: RemoteCart = serde_json::from_value(json).unwrap();
        let snapshot = cart.into_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.quantity_of(ProductId::new(5), Size::Large), 4);
    }

    #[test]
    fn test_clear_candidates() {
        assert_eq!(ClearRoute::candidates(false), vec![ClearRoute::Canonical]);
        assert_eq!(
            ClearRoute::candidates(true),
            vec![
                ClearRoute::Canonical,
                ClearRoute::ClearCart,
                ClearRoute::Clear,
                ClearRoute::ClearMyCart
            ]
        );
        assert_eq!(ClearRoute::Canonical.to_string(), "Cart/clear");
    }
}
