//! Error types for model backends.

/// Failures talking to a language model backend.
///
/// Every variant names the provider and carries the provider's own message
/// where one exists. Nothing here is retried by the gateway itself.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{provider}: no API key configured")]
    MissingApiKey { provider: &'static str },
    #[error("{provider}: cannot connect to {url}")]
    Connection { provider: &'static str, url: String },
    #[error("{provider}: request timed out after {secs}s")]
    Timeout { provider: &'static str, secs: u64 },
    #[error("{provider}: authentication failed ({status}): {message}")]
    Auth {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("{provider}: rate limited: {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
    },
    #[error("{provider}: API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("{provider}: invalid response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
    #[error("{provider}: empty response")]
    EmptyResponse { provider: &'static str },
    #[error("{provider}: HTTP client error: {message}")]
    Http {
        provider: &'static str,
        message: String,
    },
}

impl GatewayError {
    /// Provider that produced the error.
    pub fn provider(&self) -> &'static str {
        match self {
            GatewayError::MissingApiKey { provider }
            | GatewayError::Connection { provider, .. }
            | GatewayError::Timeout { provider, .. }
            | GatewayError::Auth { provider, .. }
            | GatewayError::RateLimited { provider, .. }
            | GatewayError::Api { provider, .. }
            | GatewayError::InvalidResponse { provider, .. }
            | GatewayError::EmptyResponse { provider }
            | GatewayError::Http { provider, .. } => provider,
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection { .. } | GatewayError::Timeout { .. } | GatewayError::Http { .. }
        )
    }
}
