//! Error types for feedback sessions.

use carelog_gateway::GatewayError;

/// Errors from the feedback engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("no transcript to analyze")]
    EmptyTranscript,
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("speech error: {0}")]
    Speech(String),
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Parse(err.to_string())
    }
}
