//! Product catalog provider.
//!
//! The catalog is an external collaborator: this client only fetches the
//! product summaries needed to enrich cart lines for display. Responses are
//! cached with `moka` (TTL from [`ClientConfig::catalog_cache_ttl`]).

mod cache;

use std::sync::Arc;

use cartwheel_core::{ProductId, ProductSummary};
use moka::future::Cache;
use tracing::{debug, instrument};
use url::Url;

use crate::api::{build_http_client, execute_envelope};
use crate::config::ClientConfig;
use crate::error::CartError;

use cache::{CacheKey, CacheValue};

/// Client for the product catalog.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, CartError> {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client: build_http_client(config)?,
                base_url: config.base_url.clone(),
                config: config.clone(),
                cache,
            }),
        })
    }

    /// Get every product summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or reports failure.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<[ProductSummary]>, CartError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let request = self.inner.client.get(self.inner.base_url.join("Products")?);
        let products: Arc<[ProductSummary]> =
            execute_envelope::<Vec<ProductSummary>>(request, self.inner.config.bearer_token())
                .await?
                .unwrap_or_default()
                .into();

        debug!(count = products.len(), "Loaded products");
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get one product summary, served from the product list.
    ///
    /// # Errors
    ///
    /// Returns an error if the product list cannot be loaded.
    pub async fn product(&self, id: ProductId) -> Result<Option<ProductSummary>, CartError> {
        Ok(self.products().await?.iter().find(|p| p.id == id).cloned())
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}
