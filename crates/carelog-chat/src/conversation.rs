//! Bounded conversation buffer.
//!
//! Holds the messages of one feedback session in insertion order, evicting
//! the oldest once the configured maximum is exceeded, and renders the
//! speaker-labelled transcript used for analysis.

use std::collections::VecDeque;

use carelog_core::types::{ChatTurn, Message, Role};
use chrono::{DateTime, Duration, Utc};

/// Per-role message counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoleCounts {
    pub user: usize,
    pub assistant: usize,
    pub system: usize,
    /// User plus assistant messages.
    pub total: usize,
}

// =============================================================================
// ConversationBuffer
// =============================================================================

#[derive(Clone, Debug)]
pub struct ConversationBuffer {
    messages: VecDeque<Message>,
    max_len: usize,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl ConversationBuffer {
    /// Create an empty buffer keeping at most `max_len` messages (at least 1).
    pub fn new(max_len: usize) -> Self {
        let now = Utc::now();
        Self {
            messages: VecDeque::new(),
            max_len: max_len.max(1),
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a message. Blank content is ignored.
    pub fn append(&mut self, role: Role, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }

        let now = Utc::now().max(self.last_activity);
        self.messages.push_back(Message {
            role,
            content: content.to_string(),
            timestamp: now,
        });
        self.last_activity = now;

        while self.messages.len() > self.max_len {
            self.messages.pop_front();
        }
    }

    /// User and assistant turns in order, as sent to the model.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(ChatTurn::from)
            .collect()
    }

    /// `"Patient: ..."` / `"Assistant: ..."` lines joined by newlines.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| format!("{}: {}", m.role.speaker_label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn counts(&self) -> RoleCounts {
        let mut counts = RoleCounts::default();
        for msg in &self.messages {
            match msg.role {
                Role::User => counts.user += 1,
                Role::Assistant => counts.assistant += 1,
                Role::System => counts.system += 1,
            }
        }
        counts.total = counts.user + counts.assistant;
        counts
    }

    /// Most recent message, optionally restricted to one role.
    pub fn last_message(&self, role: Option<Role>) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| role.is_none_or(|r| m.role == r))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Time between creation and the latest append.
    pub fn duration(&self) -> Duration {
        self.last_activity - self.created_at
    }
}
