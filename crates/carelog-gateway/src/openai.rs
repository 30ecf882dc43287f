//! OpenAI chat-completions backend.

use carelog_core::config::HostedModelConfig;
use carelog_core::types::{ChatTurn, Role};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::gateway::{resolve_setting, ChatBackend};
use crate::http::{endpoint, HttpTransport};

const PROVIDER: &str = "openai";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const CHAT_TEMPERATURE: f32 = 0.7;
const ANALYSIS_TEMPERATURE: f32 = 0.0;

/// Hosted backend speaking the OpenAI `/v1/chat/completions` protocol.
pub struct OpenAiBackend {
    transport: HttpTransport,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiBackend {
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

    /// Build from config, filling blanks from `OPENAI_API_KEY` and
    /// `OPENAI_MODEL`.
    pub fn from_config(config: &HostedModelConfig, timeout_secs: u64) -> Result<Self, GatewayError> {
        let api_key = resolve_setting(&config.api_key, std::env::var("OPENAI_API_KEY").ok(), "");
        let model = resolve_setting(&config.model, std::env::var("OPENAI_MODEL").ok(), DEFAULT_MODEL);
        let base_url = resolve_setting(&config.base_url, None, DEFAULT_BASE_URL);
        Self::new(&api_key, &model, &base_url, timeout_secs)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, GatewayError> {
        let url = endpoint(&self.base_url, "/v1/chat/completions");
        let auth = format!("Bearer {}", self.api_key);
        let response: CompletionResponse =
            self.transport
                .post_json(&url, &[("Authorization", auth.as_str())], request)?;
        extract_reply(response)
    }
}

impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn chat(&self, history: &[ChatTurn], system_prompt: &str) -> Result<String, GatewayError> {
        let request = chat_request(&self.model, history, system_prompt);
        self.complete(&request)
    }

    fn analyze(&self, transcript: &str, system_prompt: &str) -> Result<String, GatewayError> {
        let request = analysis_request(&self.model, transcript, system_prompt);
        self.complete(&request)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn chat_request<'a>(
    model: &'a str,
    history: &'a [ChatTurn],
    system_prompt: &'a str,
) -> CompletionRequest<'a> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(WireMessage {
        role: Role::System.as_str(),
        content: system_prompt,
    });
    messages.extend(
        history
            .iter()
            .filter(|turn| turn.role != Role::System)
            .map(|turn| WireMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            }),
    );

    CompletionRequest {
        model,
        messages,
        temperature: CHAT_TEMPERATURE,
        response_format: None,
    }
}

fn analysis_request<'a>(
    model: &'a str,
    transcript: &'a str,
    system_prompt: &'a str,
) -> CompletionRequest<'a> {
    CompletionRequest {
        model,
        messages: vec![
            WireMessage {
                role: Role::System.as_str(),
                content: system_prompt,
            },
            WireMessage {
                role: Role::User.as_str(),
                content: transcript,
            },
        ],
        temperature: ANALYSIS_TEMPERATURE,
        response_format: Some(ResponseFormat {
            kind: "json_object",
        }),
    }
}

fn extract_reply(response: CompletionResponse) -> Result<String, GatewayError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GatewayError::EmptyResponse { provider: PROVIDER })
}
