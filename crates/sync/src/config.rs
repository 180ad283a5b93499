//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CART_API_BASE_URL` - Base URL of the cart backend (default: `https://localhost:7015/api`)
//! - `CART_API_TOKEN` - Bearer token issued by the authentication provider
//! - `CART_CLEAR_FALLBACK` - Probe alternate clear routes when the canonical one fails (default: true)
//! - `CART_SHIPPING_FLAT_RATE` - Flat shipping charge for non-empty carts (default: 6.00)
//! - `CART_CURRENCY` - Currency for prices and totals: USD, EUR, GBP, CAD, AUD (default: USD)
//! - `CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime in seconds (default: 300)
//! - `CART_REQUEST_TIMEOUT_SECS` - Per-request timeout; transport default when unset

use std::str::FromStr;
use std::time::Duration;

use cartwheel_core::CurrencyCode;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://localhost:7015/api";
const DEFAULT_SHIPPING_FLAT_RATE: &str = "6.00";
const DEFAULT_CATALOG_TTL_SECS: u64 = 300;
const MIN_TOKEN_ENTROPY: f64 = 3.3;

// Matched case-insensitively against CART_API_TOKEN
const PLACEHOLDER_MARKERS: &[&str] = &[
    "your-",
    "changeme",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "token-here",
    "bearer ",
];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is invalid: {1}")]
    InvalidEnvVar(String, String),
    #[error("{0} rejected: {1}")]
    InsecureSecret(String, String),
}

/// Cart client configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the backend API, always ending in `/`
    pub base_url: Url,
    /// Bearer token supplied by the authentication provider
    pub api_token: Option<SecretString>,
    /// Whether `clear` probes the alternate routes after the canonical one
    pub clear_fallback: bool,
    /// Flat shipping charge applied to non-empty carts
    pub shipping_flat_rate: Decimal,
    /// Currency used when rendering prices
    pub currency_code: CurrencyCode,
    /// Lifetime of cached catalog data
    pub catalog_cache_ttl: Duration,
    /// Per-request timeout; `None` leaves the transport default in place
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("clear_fallback", &self.clear_fallback)
            .field("shipping_flat_rate", &self.shipping_flat_rate)
            .field("currency_code", &self.currency_code)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Build a configuration for `base_url` with every other setting at its
    /// default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse or is not
    /// http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("CART_API_BASE_URL", base_url)?,
            api_token: None,
            clear_fallback: true,
            shipping_flat_rate: Decimal::new(600, 2),
            currency_code: CurrencyCode::USD,
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
            request_timeout: None,
        })
    }

    /// Attach a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.api_token = Some(token);
        self
    }

    /// Read every setting from the environment, after loading `.env` if one
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or if the token fails
    /// validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let base_url = parse_base_url(
            "CART_API_BASE_URL",
            &env_or("CART_API_BASE_URL", DEFAULT_BASE_URL),
        )?;
        let api_token = env_var("CART_API_TOKEN")
            .map(|value| {
                check_token(&value, "CART_API_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;
        let clear_fallback = parse_bool(
            "CART_CLEAR_FALLBACK",
            &env_or("CART_CLEAR_FALLBACK", "true"),
        )?;
        let shipping_flat_rate = parse_env_value::<Decimal>(
            "CART_SHIPPING_FLAT_RATE",
            &env_or("CART_SHIPPING_FLAT_RATE", DEFAULT_SHIPPING_FLAT_RATE),
        )?;
        let currency_code =
            parse_env_value::<CurrencyCode>("CART_CURRENCY", &env_or("CART_CURRENCY", "USD"))?;
        let catalog_cache_ttl = Duration::from_secs(parse_env_value::<u64>(
            "CATALOG_CACHE_TTL_SECS",
            &env_or("CATALOG_CACHE_TTL_SECS", &DEFAULT_CATALOG_TTL_SECS.to_string()),
        )?);
        let request_timeout = env_var("CART_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_env_value::<u64>("CART_REQUEST_TIMEOUT_SECS", &raw))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            base_url,
            api_token,
            clear_fallback,
            shipping_flat_rate,
            currency_code,
            catalog_cache_ttl,
            request_timeout,
        })
    }

    /// Expose the bearer token for a request header.
    pub(crate) fn bearer_token(&self) -> Option<&str> {
        self.api_token.as_ref().map(ExposeSecret::expose_secret)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// A set, non-blank environment variable.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// An environment variable, or `default` when unset or blank.
fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

/// Parse a value, reporting failures against the variable name.
fn parse_env_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse the API base URL and normalize it to end with `/` so relative
/// route paths join beneath it instead of replacing its last segment.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Bits of entropy per character, estimated from character frequencies.
fn entropy_per_char(s: &str) -> f64 {
    let mut chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return 0.0;
    }
    chars.sort_unstable();

    #[allow(clippy::cast_precision_loss)]
    let total = chars.len() as f64;
    chars
        .chunk_by(|a, b| a == b)
        .map(|run| {
            #[allow(clippy::cast_precision_loss)]
            let p = run.len() as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject tokens that are obviously not real credentials.
fn check_token(token: &str, key: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(key.to_string(), reason);
    let lower = token.to_lowercase();

    if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| lower.contains(**m)) {
        return Err(insecure(format!("looks like a placeholder (contains '{marker}')")));
    }

    // JWTs and opaque session tokens are close to random
    let entropy = entropy_per_char(token);
    if entropy < MIN_TOKEN_ENTROPY {
        return Err(insecure(format!(
            "too predictable ({entropy:.2} bits/char, minimum {MIN_TOKEN_ENTROPY:.1})"
        )));
    }

    Ok(())
}
