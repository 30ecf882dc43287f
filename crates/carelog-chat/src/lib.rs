//! Feedback conversations for Carelog.
//!
//! Runs patient feedback sessions against a model gateway, turns the
//! finished transcript into a normalized [`carelog_core::RatingRecord`] and
//! hands it to a [`FeedbackStore`].

pub mod analysis;
pub mod conversation;
pub mod error;
pub mod normalizer;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod speech;
pub mod store;

pub use analysis::{run_analysis, AnalysisOutcome};
pub use conversation::{ConversationBuffer, RoleCounts};
pub use error::ChatError;
pub use normalizer::{normalize, render_display, to_value};
pub use orchestrator::{FeedbackOrchestrator, SessionEnd, SessionStart, SubmitOutcome};
pub use registry::SessionRegistry;
pub use session::{FeedbackSession, SessionScript, SessionState};
pub use speech::{SpeechBridge, SpeechInput, SpeechOutput};
pub use store::{FeedbackStore, InMemoryFeedbackStore, StoredFeedback};
