use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Conversation
// =============================================================================

/// Who authored a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The patient giving feedback.
    User,
    /// The feedback assistant (model or canned text).
    Assistant,
    /// Internal notes; never sent to the model or shown in transcripts.
    System,
}

impl Role {
    /// Wire name used by chat-completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Speaker label used when rendering transcripts.
    pub fn speaker_label(&self) -> &'static str {
        match self {
            Role::User => "Patient",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Trimmed, never empty.
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A role/content pair sent to a language model as conversational context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&Message> for ChatTurn {
    fn from(msg: &Message) -> Self {
        Self::new(msg.role, msg.content.clone())
    }
}

// =============================================================================
// Feedback record
// =============================================================================

/// Lowest value of every 1-5 rating.
pub const SCORE_MIN: u8 = 1;
/// Highest value of every 1-5 rating.
pub const SCORE_MAX: u8 = 5;
/// Neutral rating used when the model gives nothing usable.
pub const SCORE_MIDPOINT: u8 = (SCORE_MIN + SCORE_MAX) / 2;
/// Upper bound on summary bullets in a record.
pub const MAX_SUMMARY_BULLETS: usize = 5;
/// Bullet used when the model provided no usable summary.
pub const NO_FEEDBACK_BULLET: &str = "No specific feedback provided.";

/// Whether the patient trusts the diagnosis or treatment plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Yes,
    No,
    #[default]
    Partial,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Yes => "yes",
            Confidence::No => "no",
            Confidence::Partial => "partial",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five radar-chart sub-scores of an encounter, each 1-5.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadarMetrics {
    pub felt_heard: u8,
    pub concerns_addressed: u8,
    pub clear_communication: u8,
    pub respect_shown: u8,
    pub time_given: u8,
}

impl RadarMetrics {
    /// Axis names in display order.
    pub const AXES: [&'static str; 5] = [
        "felt_heard",
        "concerns_addressed",
        "clear_communication",
        "respect_shown",
        "time_given",
    ];

    /// All axes at the same value.
    pub fn uniform(value: u8) -> Self {
        Self {
            felt_heard: value,
            concerns_addressed: value,
            clear_communication: value,
            respect_shown: value,
            time_given: value,
        }
    }

    /// Axis values in the same order as [`RadarMetrics::AXES`].
    pub fn values(&self) -> [u8; 5] {
        [
            self.felt_heard,
            self.concerns_addressed,
            self.clear_communication,
            self.respect_shown,
            self.time_given,
        ]
    }
}

impl Default for RadarMetrics {
    fn default() -> Self {
        Self::uniform(SCORE_MIDPOINT)
    }
}

/// Dashboard-ready feedback derived from one conversation.
///
/// Produced only by the output normalizer, which guarantees every score is
/// within 1-5 and `summary_bullets` holds 1-5 non-empty strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub satisfaction_score: u8,
    pub radar_metrics: RadarMetrics,
    pub confidence_in_treatment: Confidence,
    pub duration_satisfaction: u8,
    pub staff_behavior: u8,
    pub summary_bullets: Vec<String>,
}

impl Default for RatingRecord {
    fn default() -> Self {
        Self {
            satisfaction_score: SCORE_MIDPOINT,
            radar_metrics: RadarMetrics::default(),
            confidence_in_treatment: Confidence::Partial,
            duration_satisfaction: SCORE_MIDPOINT,
            staff_behavior: SCORE_MIDPOINT,
            summary_bullets: vec![NO_FEEDBACK_BULLET.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
        let parsed: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(parsed, Role::System);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::User.speaker_label(), "Patient");
        assert_eq!(Role::Assistant.speaker_label(), "Assistant");
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn test_chat_turn_from_message() {
        let msg = Message {
            role: Role::Assistant,
            content: "Hello".to_string(),
            timestamp: Utc::now(),
        };
        let turn = ChatTurn::from(&msg);
        assert_eq!(turn, ChatTurn::assistant("Hello"));
    }

    #[test]
    fn test_confidence_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Confidence::Yes).unwrap(), "\"yes\"");
        assert_eq!(
            serde_json::to_string(&Confidence::Partial).unwrap(),
            "\"partial\""
        );
        assert_eq!(Confidence::default(), Confidence::Partial);
    }

    #[test]
    fn test_midpoint_is_three() {
        assert_eq!(SCORE_MIDPOINT, 3);
    }

    #[test]
    fn test_radar_axes_match_field_names() {
        let value = serde_json::to_value(RadarMetrics::uniform(4)).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), RadarMetrics::AXES.len());
        for axis in RadarMetrics::AXES {
            assert_eq!(obj[axis], 4);
        }
    }

    #[test]
    fn test_default_record_is_neutral() {
        let record = RatingRecord::default();
        assert_eq!(record.satisfaction_score, 3);
        assert_eq!(record.radar_metrics.values(), [3; 5]);
        assert_eq!(record.confidence_in_treatment, Confidence::Partial);
        assert_eq!(record.summary_bullets, vec![NO_FEEDBACK_BULLET.to_string()]);
    }

    #[test]
    fn test_record_json_field_names() {
        let json = serde_json::to_value(RatingRecord::default()).unwrap();
        for key in [
            "satisfaction_score",
            "radar_metrics",
            "confidence_in_treatment",
            "duration_satisfaction",
            "staff_behavior",
            "summary_bullets",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["confidence_in_treatment"], "partial");
    }
}
