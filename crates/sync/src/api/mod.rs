//! Remote cart API transport.
//!
//! # Architecture
//!
//! - [`CartApi`] is the seam between the sync engine and the network; one
//!   method per backend route
//! - [`HttpCartApi`] implements it over `reqwest`, decoding the backend's
//!   `{status, data, message, errors}` envelope
//! - A response is only a success when both the HTTP status and the envelope's
//!   `status` flag say so
//!
//! # Routes
//!
//! | Method | Path |
//! |---|---|
//! | GET | `Cart/GetMyCart` |
//! | POST | `Cart/AddToCartAsync` |
//! | PUT | `Cart/items/{id}/quantity` |
//! | DELETE | `Cart/DeleteCartItem?cartItemId={id}` |
//! | DELETE | `Cart/clear`, `Cart/ClearCart`, `Cart/Clear`, `Cart/ClearMyCart` |

pub mod types;

use std::future::Future;
use std::sync::Arc;

use cartwheel_core::{CartItemId, Quantity};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{CartError, body_preview};

pub use types::{
    ApiEnvelope, CartItemRecord, ClearRoute, RemoteCart, RemoteCartItem, UpsertRequest,
};

/// Operations the remote cart store exposes.
///
/// Every method resolves to `Err` for both transport-level and business-level
/// failures; callers never have to inspect an envelope themselves.
pub trait CartApi: Send + Sync + 'static {
    /// Fetch the authoritative cart.
    fn get_my_cart(&self) -> impl Future<Output = Result<RemoteCart, CartError>> + Send;

    /// Create or update the line for the request's `(productId, size)` key.
    fn add_to_cart(
        &self,
        request: UpsertRequest,
    ) -> impl Future<Output = Result<CartItemRecord, CartError>> + Send;

    /// Set the quantity of a persisted line.
    fn update_quantity(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Delete a persisted line.
    fn delete_cart_item(&self, id: CartItemId) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Clear the cart through one specific route.
    fn clear(&self, route: ClearRoute) -> impl Future<Output = Result<(), CartError>> + Send;
}

// =============================================================================
// HttpCartApi
// =============================================================================

/// `reqwest`-backed client for the cart backend.
#[derive(Clone)]
pub struct HttpCartApi {
    inner: Arc<HttpCartApiInner>,
}

struct HttpCartApiInner {
    client: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
}

impl HttpCartApi {
    /// Create a new cart API client.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, CartError> {
        Ok(Self {
            inner: Arc::new(HttpCartApiInner {
                client: build_http_client(config)?,
                base_url: config.base_url.clone(),
                config: config.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, CartError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Send a request and decode the response envelope.
    ///
    /// The body is read as text first so that failures can be logged with
    /// the payload the server actually sent.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, CartError> {
        execute_envelope(request, self.inner.config.bearer_token()).await
    }
}

/// Build the shared `reqwest` client. No timeout is set unless configured.
pub(crate) fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, CartError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Send `request` with optional bearer auth and unwrap the backend envelope.
pub(crate) async fn execute_envelope<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    bearer_token: Option<&str>,
) -> Result<Option<T>, CartError> {
    let request = match bearer_token {
        Some(token) => request.bearer_auth(token),
        None => request,
    };

    let response = request.send().await.inspect_err(|e| {
        tracing::error!(error = %e, "Cart API request failed before a response arrived");
    })?;

    let status = response.status();
    let response_text = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %body_preview(&response_text),
            "Cart API returned non-success status"
        );
        return Err(CartError::Http {
            status: status.as_u16(),
            body: body_preview(&response_text),
        });
    }

    let envelope: ApiEnvelope<T> = serde_json::from_str(&response_text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body_preview(&response_text),
            "Failed to parse cart API response"
        );
        CartError::Parse(e)
    })?;

    if !envelope.status {
        tracing::warn!(
            status_code = ?envelope.status_code,
            message = ?envelope.message,
            errors = ?envelope.errors,
            "Cart API reported failure"
        );
        return Err(CartError::business(envelope.message, envelope.errors));
    }

    Ok(envelope.data)
}

impl CartApi for HttpCartApi {
    #[instrument(skip(self))]
    async fn get_my_cart(&self) -> Result<RemoteCart, CartError> {
        let request = self.inner.client.get(self.url("Cart/GetMyCart")?);
        let cart = self
            .execute::<RemoteCart>(request)
            .await?
            .ok_or(CartError::MissingData("cart"))?;

        debug!(items = cart.items.len(), "Loaded cart");
        Ok(cart)
    }

    #[instrument(skip(self), fields(product_id = %request.product_id, size = request.size.code(), quantity = %request.quantity))]
    async fn add_to_cart(&self, request: UpsertRequest) -> Result<CartItemRecord, CartError> {
        let http_request = self
            .inner
            .client
            .post(self.url("Cart/AddToCartAsync")?)
            .json(&request);

        self.execute::<CartItemRecord>(http_request)
            .await?
            .ok_or(CartError::MissingData("cart item"))
    }

    #[instrument(skip(self), fields(cart_item_id = %id, quantity = %quantity))]
    async fn update_quantity(&self, id: CartItemId, quantity: Quantity) -> Result<(), CartError> {
        // The backend takes the bare number as the request body
        let request = self
            .inner
            .client
            .put(self.url(&format!("Cart/items/{id}/quantity"))?)
            .json(&quantity.get());

        self.execute::<IgnoredAny>(request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(cart_item_id = %id))]
    async fn delete_cart_item(&self, id: CartItemId) -> Result<(), CartError> {
        let mut url = self.url("Cart/DeleteCartItem")?;
        url.query_pairs_mut()
            .append_pair("cartItemId", &id.to_string());

        self.execute::<IgnoredAny>(self.inner.client.delete(url))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(route = %route))]
    async fn clear(&self, route: ClearRoute) -> Result<(), CartError> {
        let request = self.inner.client.delete(self.url(route.path())?);
        self.execute::<IgnoredAny>(request).await?;
        Ok(())
    }
}
