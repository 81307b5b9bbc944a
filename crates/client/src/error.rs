//! Error types for the order API client.

use orderdesk_core::IllegalTransition;
use thiserror::Error;

/// Errors that can occur when talking to the order API.
///
/// Every variant is returned to the caller unchanged; nothing is retried.
#[derive(Debug, Error)]
pub enum OrderError {
    /// HTTP request failed before a response arrived (network, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// The order (or route) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The order changed since it was read (stale `If-Match` version).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The API returned a success status without a body.
    #[error("empty response from {operation}")]
    EmptyResponse {
        /// Operation that received the empty response.
        operation: &'static str,
    },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Failed to build a request body.
    #[error("Encode error: {0}")]
    Encode(String),

    /// The transition is not allowed from the order's current state.
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// The client could not be constructed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrderError {
    /// HTTP status associated with the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Unauthorized(_) => Some(401),
            Self::Conflict(_) => Some(409),
            _ => None,
        }
    }

    /// Whether the failure was detected locally without contacting the server.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::IllegalTransition(_) | Self::Encode(_) | Self::Config(_)
        )
    }
}

/// Error body shapes returned by the order API.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Best message available in the body.
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}
