//! Model gateway for Carelog.
//!
//! One closed set of language model backends (OpenAI, Anthropic and a
//! deterministic mock) behind two operations: chat continuation and
//! structured analysis of a finished transcript.

pub mod anthropic;
pub mod error;
pub mod gateway;
mod http;
pub mod mock;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use error::GatewayError;
pub use gateway::{ChatBackend, ModelGateway, ProviderKind};
pub use mock::MockBackend;
pub use openai::OpenAiBackend;
