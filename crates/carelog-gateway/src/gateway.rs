//! The closed set of model backends and the interface they share.

use carelog_core::config::ModelConfig;
use carelog_core::types::ChatTurn;
use tracing::{info, warn};

use crate::anthropic::AnthropicBackend;
use crate::error::GatewayError;
use crate::mock::MockBackend;
use crate::openai::OpenAiBackend;

/// Operations every model backend implements.
pub trait ChatBackend {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Produce the next assistant utterance for `history` under the persona
    /// described by `system_prompt`.
    fn chat(&self, history: &[ChatTurn], system_prompt: &str) -> Result<String, GatewayError>;

    /// Analyze a finished transcript and return raw text the caller parses
    /// as JSON.
    fn analyze(&self, transcript: &str, system_prompt: &str) -> Result<String, GatewayError>;
}

/// Which backend a gateway talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Mock,
}

impl ProviderKind {
    /// Parse a provider name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "anthropic" => Some(ProviderKind::Anthropic),
            "mock" => Some(ProviderKind::Mock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A language model backend selected at construction.
///
/// Adding a provider means adding a variant here; call sites only ever see
/// [`ModelGateway::chat`] and [`ModelGateway::analyze`].
pub enum ModelGateway {
    OpenAi(OpenAiBackend),
    Anthropic(AnthropicBackend),
    Mock(MockBackend),
}

impl ModelGateway {
    /// Build the configured backend.
    ///
    /// Never fails: unknown provider names, missing API keys and HTTP client
    /// construction errors all log a warning and yield the mock backend.
    pub fn from_config(config: &ModelConfig) -> Self {
        let Some(kind) = ProviderKind::parse(&config.provider) else {
            warn!(
                provider = %config.provider,
                "Unknown model provider, falling back to mock"
            );
            return Self::mock();
        };

        let built = match kind {
            ProviderKind::OpenAi => {
                OpenAiBackend::from_config(&config.openai, config.timeout_secs).map(Self::OpenAi)
            }
            ProviderKind::Anthropic => {
                AnthropicBackend::from_config(&config.anthropic, config.timeout_secs)
                    .map(Self::Anthropic)
            }
            ProviderKind::Mock => Ok(Self::mock()),
        };

        match built {
            Ok(gateway) => {
                info!(provider = %gateway.kind(), "Model gateway ready");
                gateway
            }
            Err(e) => {
                warn!(provider = %kind, error = %e, "Model backend unavailable, falling back to mock");
                Self::mock()
            }
        }
    }

    /// The deterministic, network-free backend.
    pub fn mock() -> Self {
        Self::Mock(MockBackend::new())
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ModelGateway::OpenAi(_) => ProviderKind::OpenAi,
            ModelGateway::Anthropic(_) => ProviderKind::Anthropic,
            ModelGateway::Mock(_) => ProviderKind::Mock,
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, ModelGateway::Mock(_))
    }

    /// Continue the conversation with one assistant utterance.
    pub fn chat(&self, history: &[ChatTurn], system_prompt: &str) -> Result<String, GatewayError> {
        self.backend().chat(history, system_prompt)
    }

    /// Ask the model for a structured analysis of `transcript`.
    pub fn analyze(&self, transcript: &str, system_prompt: &str) -> Result<String, GatewayError> {
        self.backend().analyze(transcript, system_prompt)
    }

    fn backend(&self) -> &dyn ChatBackend {
        match self {
            ModelGateway::OpenAi(b) => b,
            ModelGateway::Anthropic(b) => b,
            ModelGateway::Mock(b) => b,
        }
    }
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("provider", &self.kind())
            .finish()
    }
}

/// Pick a setting: explicit config value, then environment, then default.
pub(crate) fn resolve_setting(configured: &str, env_value: Option<String>, default: &str) -> String {
    let configured = configured.trim();
    if !configured.is_empty() {
        return configured.to_string();
    }
    match env_value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("openai"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse(" OpenAI "), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("ANTHROPIC"), Some(ProviderKind::Anthropic));
        assert_eq!(ProviderKind::parse("Mock"), Some(ProviderKind::Mock));
        assert_eq!(ProviderKind::parse("gemini"), None);
        assert_eq!(ProviderKind::parse(""), None);
    }

    #[test]
    fn test_unknown_provider_falls_back_to_mock() {
        let config = ModelConfig {
            provider: "gemini".to_string(),
            ..ModelConfig::default()
        };
        let gateway = ModelGateway::from_config(&config);
        assert!(gateway.is_mock());
        assert_eq!(gateway.kind(), ProviderKind::Mock);
    }

    #[test]
    fn test_default_config_is_mock() {
        let gateway = ModelGateway::from_config(&ModelConfig::default());
        assert_eq!(gateway.kind(), ProviderKind::Mock);
    }

    #[test]
    fn test_hosted_provider_with_configured_key() {
        let mut config = ModelConfig {
            provider: "openai".to_string(),
            ..ModelConfig::default()
        };
        config.openai.api_key = "sk-test".to_string();
        let gateway = ModelGateway::from_config(&config);
        assert_eq!(gateway.kind(), ProviderKind::OpenAi);

        let mut config = ModelConfig {
            provider: "anthropic".to_string(),
            ..ModelConfig::default()
        };
        config.anthropic.api_key = "sk-ant-test".to_string();
        let gateway = ModelGateway::from_config(&config);
        assert_eq!(gateway.kind(), ProviderKind::Anthropic);
    }

    #[test]
    fn test_mock_dispatch() {
        let gateway = ModelGateway::mock();
        let reply = gateway
            .chat(&[ChatTurn::user("hello")], "persona")
            .unwrap();
        assert!(!reply.is_empty());

        let raw = gateway.analyze("Patient: fine", "analysis").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(parsed.get("satisfaction_score").is_some());
    }

    #[test]
    fn test_debug_shows_provider_only() {
        let mut config = ModelConfig {
            provider: "openai".to_string(),
            ..ModelConfig::default()
        };
        config.openai.api_key = "sk-secret".to_string();
        let gateway = ModelGateway::from_config(&config);
        let dbg = format!("{gateway:?}");
        assert!(dbg.contains("OpenAi"));
        assert!(!dbg.contains("sk-secret"));
    }

    #[test]
    fn test_resolve_setting_priority() {
        assert_eq!(
            resolve_setting("configured", Some("env".to_string()), "default"),
            "configured"
        );
        assert_eq!(
            resolve_setting("  ", Some("env".to_string()), "default"),
            "env"
        );
        assert_eq!(resolve_setting("", Some(" ".to_string()), "default"), "default");
        assert_eq!(resolve_setting("", None, "default"), "default");
    }
}
