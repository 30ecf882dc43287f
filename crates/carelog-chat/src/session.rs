//! One feedback session and its lifecycle.
//!
//! A session moves `idle -> active -> ended -> analyzed`. Every operation is
//! valid in exactly one state; calling it in any other state returns
//! [`ChatError::InvalidState`] and leaves the session untouched.

use carelog_core::config::{CarelogConfig, PromptConfig};
use carelog_core::types::{ChatTurn, Role};
use carelog_gateway::ModelGateway;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::{run_analysis, AnalysisOutcome};
use crate::conversation::ConversationBuffer;
use crate::error::ChatError;

/// Patient inputs that close the conversation.
pub const END_COMMANDS: [&str; 4] = ["end", "stop", "finish", "done"];

/// Whether `text` is one of [`END_COMMANDS`].
pub fn is_end_command(text: &str) -> bool {
    let text = text.trim();
    END_COMMANDS.iter().any(|cmd| cmd.eq_ignore_ascii_case(text))
}

/// Lifecycle state of a [`FeedbackSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Active,
    Ended,
    Analyzed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Active => "active",
            SessionState::Ended => "ended",
            SessionState::Analyzed => "analyzed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The configured text and limits a session runs with.
#[derive(Clone, Debug)]
pub struct SessionScript {
    pub prompts: PromptConfig,
    pub max_history: usize,
    pub max_message_chars: usize,
}

impl SessionScript {
    pub fn from_config(config: &CarelogConfig) -> Self {
        Self {
            prompts: config.prompts.clone(),
            max_history: config.conversation.max_history,
            max_message_chars: config.conversation.max_message_chars,
        }
    }
}

impl Default for SessionScript {
    fn default() -> Self {
        Self::from_config(&CarelogConfig::default())
    }
}

/// Closing message and final transcript of an ended session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionEnd {
    pub closing: String,
    pub transcript: String,
}

/// What a patient submission produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The assistant replied; `fallback` is set when the reply did not come
    /// from the configured backend.
    Reply { message: String, fallback: bool },
    /// The submission was an end command.
    Ended(SessionEnd),
}

// =============================================================================
// FeedbackSession
// =============================================================================

#[derive(Debug)]
pub struct FeedbackSession {
    id: Uuid,
    state: SessionState,
    buffer: ConversationBuffer,
    transcript: Option<String>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl FeedbackSession {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: SessionState::Idle,
            buffer: ConversationBuffer::new(1),
            transcript: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    /// Transcript captured when the session ended.
    pub fn final_transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<(), ChatError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ChatError::InvalidState {
                operation,
                state: self.state.as_str(),
            })
        }
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now().max(self.last_activity);
    }

    /// Open the conversation with the configured greeting.
    pub fn start(&mut self, script: &SessionScript) -> Result<String, ChatError> {
        self.require(SessionState::Idle, "start")?;

        self.buffer = ConversationBuffer::new(script.max_history);
        self.buffer.append(Role::Assistant, &script.prompts.greeting);
        self.state = SessionState::Active;
        self.touch();

        info!(session_id = %self.id, "Feedback session started");
        Ok(script.prompts.greeting.clone())
    }

    /// Record a patient message and produce the assistant's reply.
    ///
    /// End commands close the session instead. A failing backend is retried
    /// once against the mock; if that fails too the configured error reply is
    /// used, so a reply is always appended.
    pub fn submit(
        &mut self,
        text: &str,
        gateway: &ModelGateway,
        script: &SessionScript,
    ) -> Result<SubmitOutcome, ChatError> {
        self.require(SessionState::Active, "submit")?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > script.max_message_chars {
            return Err(ChatError::MessageTooLong(script.max_message_chars));
        }
        if is_end_command(text) {
            return self.end(script).map(SubmitOutcome::Ended);
        }

        self.buffer.append(Role::User, text);
        let history = self.buffer.history();

        let (message, fallback) = match gateway.chat(&history, &script.prompts.persona) {
            Ok(reply) => (reply, false),
            Err(e) => {
                warn!(
                    session_id = %self.id,
                    provider = %gateway.kind(),
                    error = %e,
                    "Chat request failed"
                );
                (self.fallback_reply(gateway, &history, &script.prompts), true)
            }
        };

        self.buffer.append(Role::Assistant, &message);
        self.touch();
        debug!(session_id = %self.id, messages = self.buffer.len(), fallback, "Reply appended");

        Ok(SubmitOutcome::Reply { message, fallback })
    }

    fn fallback_reply(
        &self,
        primary: &ModelGateway,
        history: &[ChatTurn],
        prompts: &PromptConfig,
    ) -> String {
        if primary.is_mock() {
            return prompts.error_reply.clone();
        }

        match ModelGateway::mock().chat(history, &prompts.persona) {
            Ok(reply) => {
                info!(session_id = %self.id, "Using mock reply after backend failure");
                format!("{reply} {}", prompts.fallback_notice)
            }
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Mock fallback failed");
                prompts.error_reply.clone()
            }
        }
    }

    /// Close the conversation and capture its transcript.
    pub fn end(&mut self, script: &SessionScript) -> Result<SessionEnd, ChatError> {
        self.require(SessionState::Active, "end")?;

        self.buffer.append(Role::Assistant, &script.prompts.closing);
        let transcript = self.buffer.transcript();
        self.transcript = Some(transcript.clone());
        self.state = SessionState::Ended;
        self.touch();

        let counts = self.buffer.counts();
        info!(
            session_id = %self.id,
            patient_messages = counts.user,
            duration_secs = self.buffer.duration().num_seconds(),
            "Feedback session ended"
        );

        Ok(SessionEnd {
            closing: script.prompts.closing.clone(),
            transcript,
        })
    }

    /// Analyze the conversation.
    ///
    /// A non-blank `transcript_override` is analyzed instead of the session's
    /// own transcript.
    pub fn analyze(
        &mut self,
        transcript_override: Option<&str>,
        gateway: &ModelGateway,
        script: &SessionScript,
    ) -> Result<AnalysisOutcome, ChatError> {
        self.require(SessionState::Ended, "analyze")?;

        let transcript = match transcript_override.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => self.transcript.clone().unwrap_or_default(),
        };
        if transcript.trim().is_empty() {
            return Err(ChatError::EmptyTranscript);
        }

        let outcome = run_analysis(gateway, &transcript, &script.prompts);
        self.state = SessionState::Analyzed;
        self.touch();

        info!(
            session_id = %self.id,
            satisfaction = outcome.record.satisfaction_score,
            degraded = outcome.degraded,
            "Feedback analyzed"
        );
        Ok(outcome)
    }
}

impl Default for FeedbackSession {
    fn default() -> Self {
        Self::new()
    }
}
