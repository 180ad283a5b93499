//! Error taxonomy for cart synchronization.
//!
//! Every remote failure is one of two kinds:
//! - transport-level: no response, or a non-success HTTP status
//! - business-level: HTTP success, but the response envelope says `status: false`
//!
//! Caller-side rejections ([`ValidationError`]) happen before any request is
//! built.

use cartwheel_core::ValidationError;
use thiserror::Error;

/// Maximum number of response body characters kept in errors and logs.
pub(crate) const BODY_PREVIEW_CHARS: usize = 200;

/// Errors that can occur when talking to the remote cart API.
#[derive(Debug, Error)]
pub enum CartError {
    /// Rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Request never reached the server or no response was received.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The server answered, but reported the operation as failed.
    #[error("{}", format_business_error(.message.as_deref(), .errors))]
    Business {
        message: Option<String>,
        errors: Vec<String>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A successful response omitted the payload the operation needs.
    #[error("Response has no data: {0}")]
    MissingData(&'static str),

    /// A route could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A background task could not be joined.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl CartError {
    /// Whether the failure happened at the transport level.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }

    /// Whether the server reported a business-level failure.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self, Self::Business { .. })
    }

    /// Build a business error from an envelope's message and error list.
    pub(crate) fn business(message: Option<String>, errors: Option<Vec<String>>) -> Self {
        Self::Business {
            message: message.filter(|m| !m.is_empty()),
            errors: errors.unwrap_or_default(),
        }
    }
}

fn format_business_error(message: Option<&str>, errors: &[String]) -> String {
    let mut parts = Vec::new();

    if let Some(message) = message {
        parts.push(message.to_string());
    }
    if !errors.is_empty() {
        parts.push(errors.join("; "));
    }

    if parts.is_empty() {
        "Request failed: (no error details provided)".to_string()
    } else {
        format!("Request failed: {}", parts.join(": "))
    }
}

/// Truncate a response body for error messages and logs.
pub(crate) fn body_preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
