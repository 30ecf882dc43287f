//! Where analyzed feedback goes.

use std::sync::Mutex;

use carelog_core::types::RatingRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;

/// A persisted rating record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFeedback {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub record: RatingRecord,
}

/// Persistence collaborator for analyzed feedback.
pub trait FeedbackStore: Send + Sync {
    fn save(&self, record: &RatingRecord) -> Result<StoredFeedback, ChatError>;

    /// Every stored record, oldest first.
    fn load_all(&self) -> Result<Vec<StoredFeedback>, ChatError>;
}

/// Process-local store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryFeedbackStore {
    entries: Mutex<Vec<StoredFeedback>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackStore for InMemoryFeedbackStore {
    fn save(&self, record: &RatingRecord) -> Result<StoredFeedback, ChatError> {
        let stored = StoredFeedback {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            record: record.clone(),
        };
        self.entries
            .lock()
            .map_err(|e| ChatError::Storage(format!("feedback lock poisoned: {}", e)))?
            .push(stored.clone());
        Ok(stored)
    }

    fn load_all(&self) -> Result<Vec<StoredFeedback>, ChatError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| ChatError::Storage(format!("feedback lock poisoned: {}", e)))?;
        Ok(entries.clone())
    }
}
