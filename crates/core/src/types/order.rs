//! Frozen cart contents handed to the order-placement flow.

use serde::{Deserialize, Serialize};

use super::cart::CartSnapshot;
use super::id::ProductId;
use super::size::{Size, ValidationError};

/// One line of an order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Size,
}

/// Cart contents captured at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub items: Vec<OrderLine>,
}

impl OrderDraft {
    /// Freeze a snapshot into order lines.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyCart` for an empty snapshot, and
    /// `ValidationError::InvalidProduct` if a line refers to a product id the
    /// backend cannot have issued.
    pub fn from_snapshot(snapshot: &CartSnapshot) -> Result<Self, ValidationError> {
        if snapshot.is_empty() {
            return Err(ValidationError::EmptyCart);
        }

        let items = snapshot
            .items()
            .iter()
            .map(|item| {
                if item.product_id.is_valid() {
                    Ok(OrderLine {
                        product_id: item.product_id,
                        quantity: item.quantity.get(),
                        size: item.size,
                    })
                } else {
                    Err(ValidationError::InvalidProduct(item.product_id))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { items })
    }
}
