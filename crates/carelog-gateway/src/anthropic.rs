//! Anthropic messages-API backend.

use carelog_core::config::HostedModelConfig;
use carelog_core::types::{ChatTurn, Role};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::gateway::{resolve_setting, ChatBackend};
use crate::http::{endpoint, HttpTransport};

const PROVIDER: &str = "anthropic";

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

const MAX_TOKENS: u32 = 1024;

/// Hosted backend speaking the Anthropic `/v1/messages` protocol.
pub struct AnthropicBackend {
    transport: HttpTransport,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicBackend {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, GatewayError> {
        if api_key.trim().is_empty() {
            return Err(GatewayError::MissingApiKey { provider: PROVIDER });
        }
        Ok(Self {
            transport: HttpTransport::new(PROVIDER, timeout_secs)?,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            base_url: base_url.to_string(),
        })
    }

    /// Build from config, filling blanks from `ANTHROPIC_API_KEY` and
    /// `ANTHROPIC_MODEL`.
    pub fn from_config(config: &HostedModelConfig, timeout_secs: u64) -> Result<Self, GatewayError> {
        let api_key = resolve_setting(&config.api_key, std::env::var("ANTHROPIC_API_KEY").ok(), "");
        let model = resolve_setting(
            &config.model,
            std::env::var("ANTHROPIC_MODEL").ok(),
            DEFAULT_MODEL,
        );
        let base_url = resolve_setting(&config.base_url, None, DEFAULT_BASE_URL);
        Self::new(&api_key, &model, &base_url, timeout_secs)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn send(&self, request: &MessagesRequest<'_>) -> Result<String, GatewayError> {
        let url = endpoint(&self.base_url, "/v1/messages");
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", API_VERSION),
        ];
        let response: MessagesResponse = self.transport.post_json(&url, &headers, request)?;
        extract_text(response)
    }
}

impl ChatBackend for AnthropicBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn chat(&self, history: &[ChatTurn], system_prompt: &str) -> Result<String, GatewayError> {
        let request = chat_request(&self.model, history, system_prompt);
        if request.messages.is_empty() {
            // The messages API rejects a conversation with no user turn.
            return Err(GatewayError::InvalidResponse {
                provider: PROVIDER,
                message: "conversation has no patient message to respond to".to_string(),
            });
        }
        self.send(&request)
    }

    fn analyze(&self, transcript: &str, system_prompt: &str) -> Result<String, GatewayError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: system_prompt,
            messages: vec![WireMessage {
                role: Role::User.as_str(),
                content: transcript,
            }],
        };
        self.send(&request)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// The system prompt travels separately; the message list must open with a
/// user turn, so any leading assistant turns (the canned greeting) are dropped.
fn chat_request<'a>(
    model: &'a str,
    history: &'a [ChatTurn],
    system_prompt: &'a str,
) -> MessagesRequest<'a> {
    let messages = history
        .iter()
        .filter(|turn| turn.role != Role::System)
        .skip_while(|turn| turn.role == Role::Assistant)
        .map(|turn| WireMessage {
            role: turn.role.as_str(),
            content: &turn.content,
        })
        .collect();

    MessagesRequest {
        model,
        max_tokens: MAX_TOKENS,
        system: system_prompt,
        messages,
    }
}

fn extract_text(response: MessagesResponse) -> Result<String, GatewayError> {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .find_map(|block| block.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or(GatewayError::EmptyResponse { provider: PROVIDER })
}
