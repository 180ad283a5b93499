//! Command implementations.
//!
//! Every command works on a [`Session`]: a sync engine over the HTTP cart API,
//! primed with the server's cart.

pub mod cart;
pub mod checkout;

use cartwheel_core::ValidationError;
use cartwheel_sync::{
    CartError, CartStateStore, CartSyncEngine, CatalogClient, ClearRoute, ClientConfig,
    ConfigError, FallbackError, HttpCartApi,
};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cart was not cleared ({remaining} items remain): {failures}")]
    NotCleared {
        remaining: u64,
        failures: FallbackError<ClearRoute>,
    },
}

/// A connected cart client.
pub struct Session {
    pub config: ClientConfig,
    pub engine: CartSyncEngine<HttpCartApi>,
    pub catalog: CatalogClient,
}

impl Session {
    /// Load configuration from the environment and fetch the current cart.
    pub async fn connect() -> Result<Self, CommandError> {
        let config = ClientConfig::from_env()?;
        tracing::debug!(base_url = %config.base_url, "Connecting to cart API");

        let api = HttpCartApi::new(&config)?;
        let engine = CartSyncEngine::from_config(api, CartStateStore::new(), &config);
        let catalog = CatalogClient::new(&config)?;

        engine.reload_from_remote().await?;

        Ok(Self {
            config,
            engine,
            catalog,
        })
    }
}
