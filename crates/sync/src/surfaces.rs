//! Read-only views that follow the cart state store.
//!
//! Each view registers a handler on [`CartStateStore`], seeded with the
//! current snapshot, and keeps the [`Subscription`] for as long as it lives;
//! dropping the view deregisters it.
//! Views never write to the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cartwheel_core::{
    CartSnapshot, CartTotals, CurrencyCode, DisplayRow, OrderDraft, ProductSummary,
    ValidationError, enrich,
};
use rust_decimal::Decimal;

use crate::store::{CartStateStore, Subscription};

// =============================================================================
// CountBadge
// =============================================================================

/// Total quantity indicator, as shown in the navbar and footer.
pub struct CountBadge {
    name: &'static str,
    count: Arc<AtomicU64>,
    _subscription: Subscription,
}

impl CountBadge {
    /// Attach a badge to `store`, seeded with the current snapshot.
    #[must_use]
    pub fn attach(store: &CartStateStore, name: &'static str) -> Self {
        let count = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&count);
        let subscription = store.subscribe_with_current(move |snapshot| {
            sink.store(snapshot.item_count(), Ordering::SeqCst);
        });

        Self {
            name,
            count,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Units across all lines in the latest snapshot.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CountBadge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountBadge")
            .field("name", &self.name)
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Latest snapshot holder
// =============================================================================

struct LatestSnapshot {
    slot: Arc<Mutex<CartSnapshot>>,
    _subscription: Subscription,
}

impl LatestSnapshot {
    fn attach(store: &CartStateStore) -> Self {
        let slot = Arc::new(Mutex::new(CartSnapshot::empty()));
        let sink = Arc::clone(&slot);
        let subscription = store.subscribe_with_current(move |snapshot| {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        });

        Self {
            slot,
            _subscription: subscription,
        }
    }

    fn get(&self) -> CartSnapshot {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// =============================================================================
// CartPage
// =============================================================================

/// The cart page: enriched rows and totals for the latest snapshot.
pub struct CartPage {
    latest: LatestSnapshot,
    currency_code: CurrencyCode,
    shipping_rate: Decimal,
}

impl CartPage {
    #[must_use]
    pub fn attach(store: &CartStateStore, currency_code: CurrencyCode, shipping_rate: Decimal) -> Self {
        Self {
            latest: LatestSnapshot::attach(store),
            currency_code,
            shipping_rate,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.latest.get()
    }

    /// Rows for rendering. Unknown products show placeholders.
    #[must_use]
    pub fn rows(&self, products: &[ProductSummary]) -> Vec<DisplayRow> {
        enrich(self.snapshot().items(), products, self.currency_code)
    }

    #[must_use]
    pub fn totals(&self, products: &[ProductSummary]) -> CartTotals {
        CartTotals::compute(&self.rows(products), self.shipping_rate, self.currency_code)
    }
}

// =============================================================================
// CheckoutView
// =============================================================================

/// The checkout page. Freezes the cart into an order draft on submit.
pub struct CheckoutView {
    latest: LatestSnapshot,
}

impl CheckoutView {
    #[must_use]
    pub fn attach(store: &CartStateStore) -> Self {
        Self {
            latest: LatestSnapshot::attach(store),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.latest.get()
    }

    /// Capture the latest snapshot as order lines.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyCart` when there is nothing to order.
    pub fn freeze(&self) -> Result<OrderDraft, ValidationError> {
        OrderDraft::from_snapshot(&self.snapshot())
    }
}
