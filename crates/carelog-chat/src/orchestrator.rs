//! Top-level feedback engine.
//!
//! Owns the session registry, the model gateway and the feedback store, and
//! drives each session through start, conversation, end and analysis.

use std::sync::{Arc, Mutex, MutexGuard};

use carelog_core::config::CarelogConfig;
use carelog_core::types::ChatTurn;
use carelog_gateway::ModelGateway;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{run_analysis, AnalysisOutcome};
use crate::error::ChatError;
use crate::registry::SessionRegistry;
use crate::session::{FeedbackSession, SessionScript, SessionState};
use crate::store::{FeedbackStore, StoredFeedback};

pub use crate::session::{SessionEnd, SubmitOutcome};

/// A newly opened session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStart {
    pub session_id: Uuid,
    pub greeting: String,
}

pub struct FeedbackOrchestrator {
    script: SessionScript,
    gateway: ModelGateway,
    store: Arc<dyn FeedbackStore>,
    registry: SessionRegistry,
}

impl FeedbackOrchestrator {
    pub fn new(config: &CarelogConfig, gateway: ModelGateway, store: Arc<dyn FeedbackStore>) -> Self {
        info!(
            provider = %gateway.kind(),
            max_history = config.conversation.max_history,
            session_timeout_minutes = config.conversation.session_timeout_minutes,
            "Feedback orchestrator ready"
        );
        Self {
            script: SessionScript::from_config(config),
            gateway,
            store,
            registry: SessionRegistry::new(config.conversation.session_timeout_minutes),
        }
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Open a session and return its greeting. Expired sessions are swept
    /// first.
    pub fn start(&self) -> Result<SessionStart, ChatError> {
        if let Err(e) = self.registry.sweep_expired() {
            warn!(error = %e, "Session sweep failed");
        }

        let mut session = FeedbackSession::new();
        let greeting = session.start(&self.script)?;
        let session_id = session.id();
        self.registry.insert(session)?;

        Ok(SessionStart {
            session_id,
            greeting,
        })
    }

    /// Submit a patient message to an active session.
    pub fn submit(&self, session_id: Uuid, text: &str) -> Result<SubmitOutcome, ChatError> {
        let shared = self.registry.get(session_id)?;
        let mut session = lock_session(&shared)?;
        session.submit(text, &self.gateway, &self.script)
    }

    /// End an active session.
    pub fn end(&self, session_id: Uuid) -> Result<SessionEnd, ChatError> {
        let shared = self.registry.get(session_id)?;
        let mut session = lock_session(&shared)?;
        session.end(&self.script)
    }

    /// Analyze an ended session or a bare transcript.
    ///
    /// With a session id the session must exist and be ended; a non-blank
    /// `transcript` replaces the session's own. Without one, `transcript` is
    /// required. The record is saved to the store, then the session is
    /// removed. Failures in either step are logged; the analysis is still
    /// returned.
    pub fn analyze(
        &self,
        session_id: Option<Uuid>,
        transcript: Option<&str>,
    ) -> Result<AnalysisOutcome, ChatError> {
        let outcome = match session_id {
            Some(id) => {
                let shared = self.registry.get(id)?;
                let mut session = lock_session(&shared)?;
                session.analyze(transcript, &self.gateway, &self.script)?
            }
            None => {
                let transcript = transcript
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or(ChatError::EmptyTranscript)?;
                run_analysis(&self.gateway, transcript, &self.script.prompts)
            }
        };

        match self.store.save(&outcome.record) {
            Ok(stored) => info!(feedback_id = %stored.id, "Feedback saved"),
            Err(e) => warn!(error = %e, "Failed to save feedback"),
        }
        if let Some(id) = session_id {
            if let Err(e) = self.registry.remove(id) {
                warn!(session_id = %id, error = %e, "Failed to remove analyzed session");
            }
        }

        Ok(outcome)
    }

    /// Every saved feedback record, oldest first.
    pub fn feedback_history(&self) -> Result<Vec<StoredFeedback>, ChatError> {
        self.store.load_all()
    }

    pub fn session_state(&self, session_id: Uuid) -> Result<SessionState, ChatError> {
        let shared = self.registry.get(session_id)?;
        let state = lock_session(&shared)?.state();
        Ok(state)
    }

    /// The user and assistant turns of a live session.
    pub fn session_history(&self, session_id: Uuid) -> Result<Vec<ChatTurn>, ChatError> {
        let shared = self.registry.get(session_id)?;
        let history = lock_session(&shared)?.buffer().history();
        Ok(history)
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn sweep_expired(&self) -> Result<usize, ChatError> {
        self.registry.sweep_expired()
    }
}

fn lock_session(shared: &Mutex<FeedbackSession>) -> Result<MutexGuard<'_, FeedbackSession>, ChatError> {
    shared
        .lock()
        .map_err(|e| ChatError::Storage(format!("session lock poisoned: {}", e)))
}
