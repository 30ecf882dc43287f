//! Blocking HTTP transport shared by the hosted backends.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::GatewayError;

/// Longest provider error body echoed back inside a [`GatewayError`].
const MAX_ERROR_BODY: usize = 500;

/// A JSON-over-HTTP client bound to one provider.
pub(crate) struct HttpTransport {
    client: reqwest::blocking::Client,
    provider: &'static str,
    timeout_secs: u64,
}

impl HttpTransport {
    pub(crate) fn new(provider: &'static str, timeout_secs: u64) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Http {
                provider,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            provider,
            timeout_secs,
        })
    }

    /// POST `body` as JSON and decode a JSON response.
    pub(crate) fn post_json<B, R>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<R, GatewayError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    provider: self.provider,
                    secs: self.timeout_secs,
                }
            } else if e.is_connect() {
                GatewayError::Connection {
                    provider: self.provider,
                    url: url.to_string(),
                }
            } else {
                GatewayError::Http {
                    provider: self.provider,
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    provider: self.provider,
                    secs: self.timeout_secs,
                }
            } else {
                GatewayError::Http {
                    provider: self.provider,
                    message: e.to_string(),
                }
            }
        })?;

        if !(200..300).contains(&status) {
            return Err(classify_status(self.provider, status, &text));
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse {
            provider: self.provider,
            message: e.to_string(),
        })
    }
}

/// Map a non-success HTTP status to a typed error.
pub(crate) fn classify_status(provider: &'static str, status: u16, body: &str) -> GatewayError {
    let message = provider_message(body);
    match status {
        401 | 403 => GatewayError::Auth {
            provider,
            status,
            message,
        },
        429 => GatewayError::RateLimited { provider, message },
        _ => GatewayError::Api {
            provider,
            status,
            message,
        },
    }
}

/// Pull `error.message` out of a provider error body, else the raw body.
///
/// OpenAI and Anthropic both nest the human-readable text there.
pub(crate) fn provider_message(body: &str) -> String {
    let nested = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });

    match nested {
        Some(msg) => msg,
        None => body.trim().chars().take(MAX_ERROR_BODY).collect(),
    }
}

/// Join a base URL and an API path without doubling slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth() {
        let err = classify_status("openai", 401, r#"{"error":{"message":"bad key"}}"#);
        match err {
            GatewayError::Auth {
                status, message, ..
            } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad key");
            }
            other => panic!("expected Auth, got {other:?}"),
        }
        assert!(matches!(
            classify_status("openai", 403, ""),
            GatewayError::Auth { status: 403, .. }
        ));
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = classify_status(
            "anthropic",
            429,
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"too many"}}"#,
        );
        match err {
            GatewayError::RateLimited { provider, message } => {
                assert_eq!(provider, "anthropic");
                assert_eq!(message, "too many");
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_other_status_is_api_error() {
        let err = classify_status("openai", 503, "upstream unavailable");
        match err {
            GatewayError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn test_provider_message_truncates_raw_body() {
        let body = "x".repeat(2_000);
        assert_eq!(provider_message(&body).len(), MAX_ERROR_BODY);
    }

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            endpoint("https://api.openai.com/", "/v1/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            endpoint("http://127.0.0.1:8080", "v1/messages"),
            "http://127.0.0.1:8080/v1/messages"
        );
    }
}
