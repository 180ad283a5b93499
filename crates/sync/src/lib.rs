//! Cartwheel cart synchronization.
//!
//! Keeps a client-side cart consistent with a remote cart service while
//! several views react to every change.
//!
//! # Architecture
//!
//! - [`store::CartStateStore`] holds the canonical snapshot and pushes every
//!   replacement to its subscribers
//! - [`engine::CartSyncEngine`] runs add/update/remove/clear/reload against a
//!   [`api::CartApi`] and publishes the results
//! - [`fallback::EndpointFallbackProtocol`] probes alternate routes for one
//!   logical action (used for clear)
//! - [`catalog::CatalogClient`] fetches product summaries for display
//! - [`surfaces`] are the read-only views: count badges, cart page, checkout
//!
//! # Example
//!
//! ```rust,ignore
//! use cartwheel_sync::{CartStateStore, CartSyncEngine, ClientConfig, HttpCartApi};
//!
//! let config = ClientConfig::from_env()?;
//! let store = CartStateStore::new();
//! let engine = CartSyncEngine::from_config(HttpCartApi::new(&config)?, store, &config);
//!
//! engine.reload_from_remote().await?;
//! engine.add_or_update(ProductId::new(5), Size::Large, 2).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod store;
pub mod surfaces;

pub use api::{CartApi, ClearRoute, HttpCartApi};
pub use catalog::CatalogClient;
pub use config::{ClientConfig, ConfigError};
pub use engine::{CartSyncEngine, ClearHandle, ClearOutcome, RemoveOutcome};
pub use error::CartError;
pub use fallback::{EndpointFallbackProtocol, FallbackError};
pub use store::{CartStateStore, Subscription};
pub use surfaces::{CartPage, CheckoutView, CountBadge};
