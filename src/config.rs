//! Gate configuration with URL validation and environment variable support.

use std::env;

use thiserror::Error;
use url::Url;

/// Default agent address when none is supplied.
pub const DEFAULT_AGENT_URL: &str = "http://kms:3342";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Which configuration field failed to parse
        field: String,
        /// Parser detail
        reason: String,
    },

    /// URL scheme other than http/https
    #[error("Unsupported scheme for {field}: {scheme}")]
    UnsupportedScheme {
        /// Which configuration field carried the scheme
        field: String,
        /// The rejected scheme
        scheme: String,
    },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {reason}")]
    HttpClient {
        /// Builder detail
        reason: String,
    },
}

/// Gate configuration.
///
/// The agent base address is the only tunable; it is fixed at verifier
/// construction and read-only afterwards.
#[derive(Debug, Clone)]
pub struct KmsGateConfig {
    /// Base address of the remote KMS agent
    pub agent_url: Url,
}

impl Default for KmsGateConfig {
    fn default() -> Self {
        // The default is a compile-time constant and always parses.
        #[allow(clippy::unwrap_used)]
        let agent_url = Url::parse(DEFAULT_AGENT_URL).unwrap();
        Self { agent_url }
    }
}

impl KmsGateConfig {
    /// Loads configuration from environment variables.
    ///
    /// Reads `KMS_AGENT_URL`, falling back to [`DEFAULT_AGENT_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the variable is present but not a valid
    /// http/https URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let url_str = env::var("KMS_AGENT_URL").unwrap_or_else(|_| DEFAULT_AGENT_URL.to_string());
        Self::default().with_agent_url(&url_str)
    }

    /// Replaces the agent base address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the value is not a valid http/https URL.
    pub fn with_agent_url(mut self, url_str: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(url_str).map_err(|e| ConfigError::InvalidUrl {
            field: "agent_url".to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                field: "agent_url".to_string(),
                scheme: url.scheme().to_string(),
            });
        }
        self.agent_url = url;
        Ok(self)
    }

    /// Gets the agent base address as a string.
    #[must_use]
    pub fn agent_url_str(&self) -> &str {
        self.agent_url.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_agent() {
        let config = KmsGateConfig::default();
        assert_eq!(config.agent_url_str(), "http://kms:3342/");
        assert_eq!(config.agent_url.port(), Some(3342));
    }

    #[test]
    fn test_with_agent_url_accepts_https() {
        let config = KmsGateConfig::default()
            .with_agent_url("https://kms.internal:8443")
            .unwrap();
        assert_eq!(config.agent_url.scheme(), "https");
        assert_eq!(config.agent_url.host_str(), Some("kms.internal"));
    }

    #[test]
    fn test_with_agent_url_rejects_garbage() {
        let result = KmsGateConfig::default().with_agent_url("not-a-valid-url");
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_with_agent_url_rejects_non_http_scheme() {
        let result = KmsGateConfig::default().with_agent_url("ftp://kms:3342");
        assert!(matches!(result, Err(ConfigError::UnsupportedScheme { .. })));
    }
}
