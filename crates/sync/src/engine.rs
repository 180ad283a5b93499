//! Cart synchronization engine.
//!
//! Keeps the local [`CartStateStore`] consistent with the remote cart.
//!
//! # Consistency model
//!
//! - `add_or_update` and `set_quantity` confirm first, then commit: the local
//!   snapshot changes only after the server accepts the change
//! - `remove` deletes persisted lines remotely; any failure triggers a full
//!   reload instead of a partial local correction
//! - `clear` is the one optimistic operation: the empty cart is published
//!   immediately, then confirmed through the fallback protocol, and repaired
//!   by a reload if every clear route fails
//! - `reload_from_remote` replaces the snapshot wholesale with the server's
//!   view
//!
//! Overlapping operations are not serialized. Each one applies its result to
//! whatever snapshot is current when its response arrives, so a slow earlier
//! response can overwrite a faster later one (last response wins).

use std::sync::Arc;

use cartwheel_core::{CartSnapshot, LineItem, LineKey, ProductId, Quantity, Size, ValidationError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::api::{CartApi, ClearRoute, UpsertRequest};
use crate::config::ClientConfig;
use crate::error::CartError;
use crate::fallback::{EndpointFallbackProtocol, FallbackError};
use crate::store::CartStateStore;

/// Which path a `remove` call took.
#[derive(Debug)]
pub enum RemoveOutcome {
    /// The line was not in the cart; nothing changed.
    Absent,
    /// The line had never been persisted and was dropped locally.
    RemovedLocally,
    /// The server deleted the line.
    RemovedRemote,
    /// The delete failed and the cart was reloaded from the server.
    Reconciled { cause: CartError },
}

/// How a `clear` was resolved.
#[derive(Debug)]
pub enum ClearOutcome {
    /// A clear route confirmed the empty cart.
    Confirmed { route: ClearRoute, attempts: usize },
    /// Every route failed; the cart was reloaded from the server.
    Reconciled { failures: FallbackError<ClearRoute> },
}

/// Background confirmation of a `clear`.
///
/// Dropping the handle does not cancel the request.
#[derive(Debug)]
pub struct ClearHandle {
    task: JoinHandle<Result<ClearOutcome, CartError>>,
}

impl ClearHandle {
    /// Wait for the clear to be confirmed or repaired.
    ///
    /// # Errors
    ///
    /// Returns the reload error when every clear route failed and the repair
    /// reload failed too, or `CartError::Task` if the task could not be joined.
    pub async fn wait(self) -> Result<ClearOutcome, CartError> {
        self.task
            .await
            .map_err(|e| CartError::Task(e.to_string()))?
    }
}

/// Orchestrates cart operations against the remote API.
///
/// Cheap to clone; clones share the API client and the state store.
pub struct CartSyncEngine<A> {
    inner: Arc<EngineInner<A>>,
}

struct EngineInner<A> {
    api: A,
    store: CartStateStore,
    clear_protocol: EndpointFallbackProtocol<ClearRoute>,
}

impl<A> Clone for CartSyncEngine<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: CartApi> CartSyncEngine<A> {
    /// Create an engine that probes every known clear route.
    #[must_use]
    pub fn new(api: A, store: CartStateStore) -> Self {
        Self::with_clear_routes(api, store, ClearRoute::candidates(true))
    }

    /// Create an engine honoring `config.clear_fallback`.
    #[must_use]
    pub fn from_config(api: A, store: CartStateStore, config: &ClientConfig) -> Self {
        Self::with_clear_routes(api, store, ClearRoute::candidates(config.clear_fallback))
    }

    /// Create an engine with an explicit clear candidate list.
    #[must_use]
    pub fn with_clear_routes(api: A, store: CartStateStore, routes: Vec<ClearRoute>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                api,
                store,
                clear_protocol: EndpointFallbackProtocol::new(routes),
            }),
        }
    }

    /// The state store this engine publishes to.
    #[must_use]
    pub fn store(&self) -> &CartStateStore {
        &self.inner.store
    }

    /// The remote API client.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    /// The latest local snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.store.current()
    }

    /// Replace the local snapshot with the server's cart.
    ///
    /// # Errors
    ///
    /// Returns the transport or business error; the local snapshot is left
    /// unchanged.
    #[instrument(skip(self), fields(op_id = %Uuid::new_v4()))]
    pub async fn reload_from_remote(&self) -> Result<CartSnapshot, CartError> {
        let cart = self.inner.api.get_my_cart().await.inspect_err(|e| {
            error!(error = %e, "Failed to load cart from server");
        })?;

        let snapshot = cart.into_snapshot();
        debug!(items = snapshot.len(), "Installing server cart");
        self.inner.store.replace(snapshot.clone());
        Ok(snapshot)
    }

    /// Set the quantity of the `(product_id, size)` line through the upsert
    /// route, creating the line if needed.
    ///
    /// A quantity below 1 removes the line instead. Callers are expected to
    /// clamp `quantity` to the product's stock first.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request is made, or the
    /// transport/business error of the upsert. The local snapshot is only
    /// changed on success, and failed requests are not retried.
    #[instrument(skip(self), fields(op_id = %Uuid::new_v4()))]
    pub async fn add_or_update(
        &self,
        product_id: ProductId,
        size: Size,
        quantity: i64,
    ) -> Result<CartSnapshot, CartError> {
        if quantity < 1 {
            debug!("Non-positive quantity, removing line");
            self.remove(product_id, size).await?;
            return Ok(self.snapshot());
        }

        validate_product(product_id)?;
        let quantity = Quantity::new(quantity)?;

        let record = self
            .inner
            .api
            .add_to_cart(UpsertRequest::new(product_id, size, quantity))
            .await
            .inspect_err(|e| warn!(error = %e, "Add to cart failed"))?;

        // Applied to whatever is current now, not what was current at send time
        let next = self.inner.store.current().with_upserted(LineItem::persisted(
            record.id,
            product_id,
            size,
            quantity,
        ));
        self.inner.store.replace(next.clone());

        info!(cart_item_id = %record.id, "Cart line saved");
        Ok(next)
    }

    /// Change the quantity of a line.
    ///
    /// Persisted lines use the quantity route; lines without a server id go
    /// through [`Self::add_or_update`]. A quantity below 1 removes the line.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_or_update`].
    #[instrument(skip(self), fields(op_id = %Uuid::new_v4()))]
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        size: Size,
        quantity: i64,
    ) -> Result<CartSnapshot, CartError> {
        if quantity < 1 {
            self.remove(product_id, size).await?;
            return Ok(self.snapshot());
        }

        validate_product(product_id)?;
        let validated = Quantity::new(quantity)?;
        let key = LineKey::new(product_id, size);

        let Some(id) = self.inner.store.current().get(key).and_then(|item| item.id) else {
            return self.add_or_update(product_id, size, quantity).await;
        };

        self.inner
            .api
            .update_quantity(id, validated)
            .await
            .inspect_err(|e| warn!(cart_item_id = %id, error = %e, "Quantity update failed"))?;

        let next = self.inner.store.current().with_quantity(key, validated);
        self.inner.store.replace(next.clone());
        Ok(next)
    }

    /// Add one unit of a line.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_quantity`].
    pub async fn increment(&self, product_id: ProductId, size: Size) -> Result<CartSnapshot, CartError> {
        let current = self.snapshot().quantity_of(product_id, size);
        self.set_quantity(product_id, size, i64::from(current) + 1)
            .await
    }

    /// Take one unit off a line, removing it at zero.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_quantity`].
    pub async fn decrement(&self, product_id: ProductId, size: Size) -> Result<CartSnapshot, CartError> {
        let current = self.snapshot().quantity_of(product_id, size);
        self.set_quantity(product_id, size, i64::from(current) - 1)
            .await
    }

    /// Remove the `(product_id, size)` line.
    ///
    /// Lines never persisted remotely are dropped locally without a request.
    /// When the remote delete fails, the whole cart is reloaded.
    ///
    /// # Errors
    ///
    /// Only when the delete failed and the reconciling reload failed too.
    #[instrument(skip(self), fields(op_id = %Uuid::new_v4()))]
    pub async fn remove(&self, product_id: ProductId, size: Size) -> Result<RemoveOutcome, CartError> {
        let key = LineKey::new(product_id, size);
        let current = self.inner.store.current();

        let Some(item) = current.get(key).copied() else {
            debug!("Line not in cart");
            return Ok(RemoveOutcome::Absent);
        };

        let Some(id) = item.id else {
            debug!("Line never persisted, removing locally");
            self.inner.store.replace(current.without(key));
            return Ok(RemoveOutcome::RemovedLocally);
        };

        match self.inner.api.delete_cart_item(id).await {
            Ok(()) => {
                let next = self.inner.store.current().without(key);
                self.inner.store.replace(next);
                info!(cart_item_id = %id, "Cart line deleted");
                Ok(RemoveOutcome::RemovedRemote)
            }
            Err(cause) => {
                warn!(cart_item_id = %id, error = %cause, "Delete failed, reloading cart");
                self.reload_from_remote().await?;
                Ok(RemoveOutcome::Reconciled { cause })
            }
        }
    }

    /// Empty the cart.
    ///
    /// The empty snapshot is published before this returns. Confirmation runs
    /// in a background task that tries each clear route in order and reloads
    /// the cart if none succeeds.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn clear(&self) -> ClearHandle {
        let op_id = Uuid::new_v4();
        info!(%op_id, "Clearing cart");
        self.inner.store.replace(CartSnapshot::empty());

        let engine = self.clone();
        let task = tokio::spawn(async move { engine.confirm_clear(op_id).await });
        ClearHandle { task }
    }

    #[instrument(skip(self))]
    async fn confirm_clear(&self, op_id: Uuid) -> Result<ClearOutcome, CartError> {
        let api = &self.inner.api;

        match self.inner.clear_protocol.run(|route| api.clear(route)).await {
            Ok(success) => {
                info!(
                    route = %success.candidate,
                    attempts = success.attempts,
                    "Cart clear confirmed"
                );
                Ok(ClearOutcome::Confirmed {
                    route: success.candidate,
                    attempts: success.attempts,
                })
            }
            Err(failures) => {
                warn!(
                    attempts = failures.attempts(),
                    "Every clear route failed, reloading cart"
                );
                self.reload_from_remote().await?;
                Ok(ClearOutcome::Reconciled { failures })
            }
        }
    }
}

fn validate_product(product_id: ProductId) -> Result<(), ValidationError> {
    if product_id.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::InvalidProduct(product_id))
    }
}
