//! Integration tests for Cartwheel.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartwheel-integration-tests
//! ```
//!
//! Tests drive the real `HttpCartApi` and sync engine against
//! [`FakeBackend`], an in-process `axum` server that speaks the cart
//! backend's envelope format on an ephemeral loopback port.
//!
//! # Test Categories
//!
//! - `cart_sync` - End-to-end engine operations over HTTP
//! - `clear_fallback` - Clear route probing and repair
//! - `catalog` - Product enrichment for display

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use cartwheel_sync::{CartStateStore, CartSyncEngine, ClientConfig, HttpCartApi};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Token the tests authenticate with.
pub const TEST_TOKEN: &str = "test-session-7f3a91c2e4b8d605";

/// One cart line as the fake backend stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLine {
    pub id: i32,
    pub product_id: i32,
    pub size: i32,
    pub quantity: i64,
}

/// Mutable backend state, shared with the tests.
#[derive(Debug, Default)]
pub struct BackendState {
    pub lines: Vec<StoredLine>,
    pub next_id: i32,
    /// Product payloads served from `/Products`.
    pub products: Vec<Value>,
    /// The one clear path (e.g. `Cart/ClearMyCart`) that works.
    pub working_clear: Option<String>,
    /// Reject upserts with `status: false`.
    pub reject_adds: bool,
    /// Answer deletes with HTTP 500.
    pub fail_deletes: bool,
    /// Every request as `METHOD path`, in arrival order.
    pub requests: Vec<String>,
    /// `Authorization` header of every request.
    pub authorization: Vec<Option<String>>,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process cart backend.
pub struct FakeBackend {
    pub base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Start the backend on `127.0.0.1:0`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState::default()));

        let app = Router::new()
            .route("/api/Cart/GetMyCart", get(get_my_cart))
            .route("/api/Cart/AddToCartAsync", post(add_to_cart))
            .route("/api/Cart/items/{id}/quantity", put(update_quantity))
            .route("/api/Cart/DeleteCartItem", delete(delete_cart_item))
            .route("/api/Cart/clear", delete(clear_cart))
            .route("/api/Cart/ClearCart", delete(clear_cart))
            .route("/api/Cart/Clear", delete(clear_cart))
            .route("/api/Cart/ClearMyCart", delete(clear_cart))
            .route("/api/Products", get(products))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local address");

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
            server,
        }
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the base URL is rejected.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url)
            .expect("Fake backend URL is valid")
            .with_token(SecretString::from(TEST_TOKEN.to_string()))
    }

    /// A fresh engine over HTTP, with its own store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn engine(&self) -> CartSyncEngine<HttpCartApi> {
        let config = self.config();
        let api = HttpCartApi::new(&config).expect("Failed to build HTTP client");
        CartSyncEngine::from_config(api, CartStateStore::new(), &config)
    }

    /// Inspect or change backend state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// Seed a persisted line.
    pub fn seed_line(&self, product_id: i32, size: i32, quantity: i64) -> i32 {
        self.with_state(|state| {
            state.next_id += 1;
            let id = state.next_id;
            state.lines.push(StoredLine {
                id,
                product_id,
                size,
                quantity,
            });
            id
        })
    }

    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.with_state(|state| state.requests.clone())
    }

    #[must_use]
    pub fn lines(&self) -> Vec<StoredLine> {
        self.with_state(|state| state.lines.clone())
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn record(state: &mut BackendState, headers: &HeaderMap, request: String) {
    state.requests.push(request);
    state.authorization.push(
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
}

fn ok(data: Value) -> Response {
    Json(json!({"status": true, "statusCode": 200, "data": data})).into_response()
}

fn rejected(message: &str) -> Response {
    Json(json!({
        "status": false,
        "statusCode": 400,
        "message": message,
        "errors": [message],
    }))
    .into_response()
}

async fn get_my_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    record(&mut state, &headers, "GET Cart/GetMyCart".to_string());

    let items: Vec<Value> = state
        .lines
        .iter()
        .map(|line| {
            json!({
                "id": line.id,
                "productId": line.product_id,
                "quantity": line.quantity,
                "size": line.size,
                "product": null,
            })
        })
        .collect();

    ok(json!({
        "id": 1,
        "userId": 4,
        "createdAt": "2024-05-01T12:34:56.789",
        "items": items,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertBody {
    id: i32,
    product_id: i32,
    size: i32,
    quantity: i64,
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<UpsertBody>,
) -> Response {
    let mut guard = lock(&state);
    let state = &mut *guard;
    record(
        state,
        &headers,
        format!(
            "POST Cart/AddToCartAsync id={} product={} size={} qty={}",
            body.id, body.product_id, body.size, body.quantity
        ),
    );

    if state.reject_adds {
        return rejected("Not enough stock");
    }

    let existing = state
        .lines
        .iter_mut()
        .find(|l| l.product_id == body.product_id && l.size == body.size);
    let id = if let Some(line) = existing {
        line.quantity = body.quantity;
        line.id
    } else {
        state.next_id += 1;
        let id = state.next_id;
        state.lines.push(StoredLine {
            id,
            product_id: body.product_id,
            size: body.size,
            quantity: body.quantity,
        });
        id
    };

    ok(json!({
        "id": id,
        "productId": body.product_id,
        "size": body.size,
        "quantity": body.quantity,
    }))
}

async fn update_quantity(
    State(state): State<Shared>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(quantity): Json<i64>,
) -> Response {
    let mut state = lock(&state);
    record(
        &mut state,
        &headers,
        format!("PUT Cart/items/{id}/quantity qty={quantity}"),
    );

    match state.lines.iter_mut().find(|l| l.id == id) {
        Some(line) => {
            line.quantity = quantity;
            ok(Value::Null)
        }
        None => rejected("Cart item not found"),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteParams {
    cart_item_id: i32,
}

async fn delete_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<DeleteParams>,
) -> Response {
    let mut state = lock(&state);
    record(
        &mut state,
        &headers,
        format!("DELETE Cart/DeleteCartItem cartItemId={}", params.cart_item_id),
    );

    if state.fail_deletes {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response();
    }

    state.lines.retain(|l| l.id != params.cart_item_id);
    ok(Value::Null)
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap, uri: Uri) -> Response {
    let mut state = lock(&state);
    let path = uri.path().trim_start_matches("/api/").to_string();
    record(&mut state, &headers, format!("DELETE {path}"));

    if state.working_clear.as_deref() == Some(path.as_str()) {
        state.lines.clear();
        ok(Value::Null)
    } else if path == "Cart/clear" {
        // The canonical route exists but reports failure
        rejected("Clear is not supported")
    } else {
        (StatusCode::NOT_FOUND, "").into_response()
    }
}

async fn products(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    record(&mut state, &headers, "GET Products".to_string());
    ok(Value::Array(state.products.clone()))
}
