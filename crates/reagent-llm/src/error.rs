//! Error types for gateway operations

use std::time::Duration;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while calling a language model
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network-level failure (connection refused, reset, DNS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not complete within its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The server answered with a 5xx status
    #[error("Server error (HTTP {status}): {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[cfg(feature = "openai")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Whether retrying the same request may succeed
    ///
    /// Only transport-level failures are transient. Content and
    /// configuration problems fail the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::RateLimited(_) => true,
            Self::Server { status, .. } => *status >= 500,
            #[cfg(feature = "openai")]
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

impl From<GatewayError> for reagent_core::Error {
    fn from(err: GatewayError) -> Self {
        reagent_core::Error::GatewayTransport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Transport("reset".into()).is_transient());
        assert!(GatewayError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(GatewayError::RateLimited("slow down".into()).is_transient());
        assert!(
            GatewayError::Server {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );

        assert!(!GatewayError::AuthenticationFailed.is_transient());
        assert!(!GatewayError::InvalidRequest("bad".into()).is_transient());
        assert!(!GatewayError::UnexpectedResponse("empty".into()).is_transient());
    }

    #[test]
    fn test_conversion_to_core_error() {
        let err: reagent_core::Error = GatewayError::Transport("reset".into()).into();
        assert_eq!(err.kind(), reagent_core::ErrorKind::GatewayTransport);
        assert!(err.to_string().contains("reset"));
    }
}
