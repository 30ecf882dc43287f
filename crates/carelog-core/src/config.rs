use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Top-level configuration for the Carelog application.
///
/// Loaded from `~/.carelog/config.toml` by default. Every section falls back
/// to its defaults when omitted, so a partial file is always valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarelogConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
}

impl CarelogConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CarelogConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Language model backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Backend name: "openai", "anthropic" or "mock". Unknown names run the mock.
    pub provider: String,
    /// Per-request timeout for hosted backends, in seconds.
    pub timeout_secs: u64,
    #[serde(default)]
    pub openai: HostedModelConfig,
    #[serde(default)]
    pub anthropic: HostedModelConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            timeout_secs: 30,
            openai: HostedModelConfig::default(),
            anthropic: HostedModelConfig::default(),
        }
    }
}

/// Connection settings for one hosted model provider.
///
/// Empty values are resolved by the gateway at construction time: the API
/// key and model from the environment, the base URL from the provider's
/// public endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedModelConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Conversation buffering and session lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Messages kept per conversation before the oldest are evicted.
    pub max_history: usize,
    /// Longest accepted user message, in characters.
    pub max_message_chars: usize,
    /// Minutes of inactivity before a session is swept from memory.
    pub session_timeout_minutes: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: 50,
            max_message_chars: 2000,
            session_timeout_minutes: 30,
        }
    }
}

/// Text handed to the model or shown to the patient.
///
/// The conversation engine treats all of these as opaque strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// First assistant message of every session.
    pub greeting: String,
    /// Assistant message appended when a session ends.
    pub closing: String,
    /// System prompt for the conversational persona.
    pub persona: String,
    /// System prompt for structured analysis.
    pub analysis: String,
    /// User message wrapping the transcript; `{transcript}` is substituted.
    pub analysis_template: String,
    /// Appended to a reply produced by the fallback backend.
    pub fallback_notice: String,
    /// Reply used when no backend could answer.
    pub error_reply: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello! Thank you for speaking with us today. To start, how was your overall experience at the clinic?".to_string(),
            closing: "Thank you for your feedback. We are now analyzing your response.".to_string(),
            persona: DEFAULT_PERSONA_PROMPT.to_string(),
            analysis: DEFAULT_ANALYSIS_PROMPT.to_string(),
            analysis_template: "Now analyze this conversation:\n\n{transcript}\n\nOutput the JSON response:".to_string(),
            fallback_notice: "[Note: System fallback engaged due to connection error]".to_string(),
            error_reply: "I'm sorry, I'm having trouble responding right now. Please try again in a moment.".to_string(),
        }
    }
}

impl PromptConfig {
    /// Render the analysis user message for a transcript.
    pub fn analysis_message(&self, transcript: &str) -> String {
        if self.analysis_template.contains("{transcript}") {
            self.analysis_template.replace("{transcript}", transcript)
        } else {
            format!("{}\n\n{}", self.analysis_template, transcript)
        }
    }
}

const DEFAULT_PERSONA_PROMPT: &str = "You are a warm, attentive healthcare feedback assistant talking with a patient about a recent visit. \
Acknowledge how they feel, respond to what they just said, and ask at most one short follow-up question. \
Find out how satisfied they were, what went well, what went badly, and what could improve. \
Keep replies to one to three sentences. Do not score or summarize the visit; the system ends the conversation.";

const DEFAULT_ANALYSIS_PROMPT: &str = r#"You analyze patient feedback conversations for a clinical dashboard.
Rate every field on a 1-5 scale unless stated otherwise, using 3 when the conversation gives no evidence.
Respond with JSON only, in exactly this shape:
{
  "satisfaction_score": <1-5>,
  "radar_metrics": {
    "felt_heard": <1-5>,
    "concerns_addressed": <1-5>,
    "clear_communication": <1-5>,
    "respect_shown": <1-5>,
    "time_given": <1-5>
  },
  "confidence_in_treatment": "<yes|no|partial>",
  "duration_satisfaction": <1-5>,
  "staff_behavior": <1-5>,
  "summary_bullets": ["<key point>", "..."]
}
Give four or five summary bullets based only on what the patient said."#;
