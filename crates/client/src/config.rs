//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ORDER_API_BASE_URL` - Base URL of the order server (e.g. `https://shop.example.com`)
//!
//! ## Optional
//! - `ORDER_API_TOKEN` - Bearer token identifying the caller (needed for `/api/orders/user`
//!   and admin-only transitions)
//! - `ORDER_API_TIMEOUT_SECS` - Request timeout in seconds (default: 30)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Prefixes of values left over from a sample `.env` (case-insensitive).
///
/// Tokens are issued by the server, so only obvious leftovers are flagged.
const PLACEHOLDER_PREFIXES: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "change-me",
    "replace-me",
    "replace_me",
    "placeholder",
    "<",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Order API client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the order server; API paths are appended to it.
    pub base_url: Url,
    /// Bearer token for the current actor.
    pub api_token: Option<SecretString>,
    /// Per-request timeout enforced by the HTTP transport.
    pub timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration for `base_url` with no token and the default timeout.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.api_token = Some(token);
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from the process environment (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("ORDER_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("ORDER_API_BASE_URL".to_string()))?;
        let base_url = parse_base_url(&raw_url)?;

        let timeout_secs = match lookup("ORDER_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("ORDER_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ORDER_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let api_token = lookup("ORDER_API_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .map(|token| {
                if let Some(prefix) = placeholder_prefix(&token) {
                    tracing::warn!(
                        "ORDER_API_TOKEN looks like a placeholder (starts with '{prefix}')"
                    );
                }
                SecretString::from(token)
            });

        Ok(Self {
            base_url,
            api_token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate the base URL (must be http or https).
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        ConfigError::InvalidEnvVar("ORDER_API_BASE_URL".to_string(), e.to_string())
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "ORDER_API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "ORDER_API_BASE_URL".to_string(),
            "URL cannot be used as a base".to_string(),
        ));
    }

    Ok(url)
}

/// Placeholder prefix `token` starts with, if any.
fn placeholder_prefix(token: &str) -> Option<&'static str> {
    let lower = token.trim().to_lowercase();
    PLACEHOLDER_PREFIXES
        .iter()
        .find(|prefix| lower.starts_with(**prefix))
        .copied()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_requires_base_url() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "ORDER_API_BASE_URL"));
    }

    #[test]
    fn test_defaults() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("ORDER_API_BASE_URL", "http://localhost:5000")]))
                .unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:5000/");
        assert!(config.api_token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_token_and_timeout() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("ORDER_API_BASE_URL", "https://shop.test"),
            ("ORDER_API_TOKEN", "eyJhbGciOiJIUzI1NiJ9.k3Jd9qPz"),
            ("ORDER_API_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(
            config.api_token.as_ref().unwrap().expose_secret(),
            "eyJhbGciOiJIUzI1NiJ9.k3Jd9qPz"
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            ("ORDER_API_BASE_URL", "https://shop.test"),
            ("ORDER_API_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "ORDER_API_TIMEOUT_SECS"));

        let err = ClientConfig::from_lookup(lookup_from(&[
            ("ORDER_API_BASE_URL", "https://shop.test"),
            ("ORDER_API_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = ClientConfig::from_lookup(lookup_from(&[(
            "ORDER_API_BASE_URL",
            "ftp://shop.test",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new(Url::parse("https://shop.test").unwrap())
            .with_token(SecretString::from("super-private-token".to_string()));
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-private-token"));
    }

    #[test]
    fn test_placeholder_tokens_are_flagged() {
        assert_eq!(placeholder_prefix("your-token-here"), Some("your-"));
        assert_eq!(placeholder_prefix("<ORDER_API_TOKEN>"), Some("<"));
        assert_eq!(placeholder_prefix("ChangeMe"), Some("changeme"));
    }

    #[test]
    fn test_issued_tokens_are_not_flagged() {
        // Server-issued tokens may contain any substring or repeat characters.
        assert_eq!(placeholder_prefix("eyJhbGciOiJIUzI1NiJ9.k3Jd9qPz"), None);
        assert_eq!(placeholder_prefix("tok_xxxInsertTodoExample"), None);
        assert_eq!(placeholder_prefix("aaaaaaaaaaaa"), None);
    }
}
