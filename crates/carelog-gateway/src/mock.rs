//! Deterministic, network-free backend.
//!
//! Replies are picked by keyword-matching the latest patient message and by
//! how far the conversation has progressed. Within a reply set the choice is
//! `user turns % set length`, so the same history always gets the same reply.

use std::sync::LazyLock;

use carelog_core::types::{ChatTurn, Role};
use regex::Regex;
use serde_json::json;

use crate::error::GatewayError;
use crate::gateway::ChatBackend;

const PROVIDER: &str = "mock";

pub const GREETING_REPLIES: &[&str] = &[
    "Hello! I'm here to hear about your healthcare visit today. How was your overall experience?",
    "Hi there! Thank you for taking the time to share your feedback. What brings you here today?",
    "Welcome! I'd love to hear about your recent healthcare experience. What stood out to you?",
];

pub const NEGATIVE_REPLIES: &[&str] = &[
    "I'm truly sorry to hear that. That sounds very difficult. Can you tell me more about what happened?",
    "That's really concerning to hear. Your experience matters. What specifically went wrong?",
    "I appreciate you sharing that, even though it was negative. What would have made it better?",
];

pub const WAIT_REPLIES: &[&str] = &[
    "Wait times can be so frustrating. How long did you have to wait approximately?",
    "I understand waiting is difficult. Did anyone communicate about the delay?",
    "That's a common concern we hear. Was there anything available to make the wait more comfortable?",
];

pub const RUDE_REPLIES: &[&str] = &[
    "I'm sorry you felt that way. No one should feel dismissed. Who was involved in that interaction?",
    "That's not the experience we want anyone to have. Can you describe what happened?",
    "Your feelings are valid. Would you like to share more details about that interaction?",
];

pub const POSITIVE_REPLIES: &[&str] = &[
    "That's wonderful to hear! What made it such a positive experience?",
    "I'm so glad! Was there a particular person or aspect that stood out?",
    "That's great feedback! Would you recommend us to others? Why?",
];

pub const FRIENDLY_REPLIES: &[&str] = &[
    "It's great that the staff made a positive impression! Anyone specific you'd like to mention?",
    "We love hearing this! Friendly interactions make such a difference, don't they?",
    "That's exactly what we aim for. Was the rest of your visit equally positive?",
];

pub const DOCTOR_REPLIES: &[&str] = &[
    "How was your interaction with the doctor? Did they address all your concerns?",
    "The doctor-patient relationship is so important. Did you feel heard?",
    "Was the doctor able to explain things in a way you understood?",
];

pub const NURSE_REPLIES: &[&str] = &[
    "Nurses play such a vital role. How was your experience with them?",
    "Our nursing staff works hard. Did they make you feel comfortable?",
    "Were the nurses attentive to your needs?",
];

pub const APPOINTMENT_REPLIES: &[&str] = &[
    "How was the appointment scheduling process?",
    "Was it easy to get an appointment at a time that worked for you?",
    "Did the appointment start on time?",
];

pub const FACILITY_REPLIES: &[&str] = &[
    "The environment matters. Was the facility up to your expectations?",
    "Cleanliness is important to us. How did you find the facilities?",
    "What did you think about the overall atmosphere of our facility?",
];

pub const OFF_TOPIC_REPLIES: &[&str] = &[
    "I appreciate the conversation! Though I'd love to hear more about your healthcare experience specifically. Anything else you'd like to share about your visit?",
];

pub const SECOND_EXCHANGE_REPLIES: &[&str] = &[
    "Thank you for sharing that. Is there anything specific about the staff you'd like to mention?",
    "I appreciate that feedback. What about the facilities - how did you find them?",
    "Got it. How was the communication throughout your visit?",
];

pub const THIRD_EXCHANGE_REPLIES: &[&str] = &[
    "That's helpful to know. Were there any surprises during your visit, good or bad?",
    "I see. If you could change one thing about your experience, what would it be?",
    "Thank you. Is there anything else that stands out in your memory?",
];

pub const FOURTH_EXCHANGE_REPLIES: &[&str] = &[
    "You've shared some valuable insights. Any final thoughts before we wrap up?",
    "This is really helpful feedback. Anything else you'd like to add?",
    "I appreciate all you've shared. Is there anything we haven't covered?",
];

pub const LATER_EXCHANGE_REPLIES: &[&str] = &[
    "Thank you for continuing to share. What else would you like to mention?",
    "I'm still listening. Feel free to share any other thoughts.",
    "Is there anything else about your experience you'd like to discuss?",
    "Your feedback is valuable. Please continue if there's more.",
    "I appreciate your openness. What else comes to mind?",
];

// =============================================================================
// Keyword tables
// =============================================================================

struct KeywordRule {
    pattern: Regex,
    replies: &'static [&'static str],
}

fn rule(pattern: &str, replies: &'static [&'static str]) -> KeywordRule {
    KeywordRule {
        pattern: Regex::new(pattern).expect("Invalid mock keyword regex"),
        replies,
    }
}

/// Checked in order; the first match wins.
static CHAT_RULES: LazyLock<Vec<KeywordRule>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)bad|terrible|awful|horrible|worst", NEGATIVE_REPLIES),
        rule(r"(?i)long|slow|wait|delayed", WAIT_REPLIES),
        rule(r"(?i)rude|mean|dismissive|ignored", RUDE_REPLIES),
        rule(r"(?i)good|great|excellent|amazing|wonderful", POSITIVE_REPLIES),
        rule(r"(?i)nice|friendly|helpful|kind|caring", FRIENDLY_REPLIES),
        // Bare "dr" only as a word; as a substring it hits "address", "drive".
        rule(r"(?i)doctor|physician|\bdr\b", DOCTOR_REPLIES),
        rule(r"(?i)nurs", NURSE_REPLIES),
        rule(r"(?i)appointment|schedule|booking", APPOINTMENT_REPLIES),
        rule(r"(?i)clean|dirty|facility|room|building", FACILITY_REPLIES),
        rule(r"(?i)marketing|sales|weather|sports|politics", OFF_TOPIC_REPLIES),
    ]
});

/// Sentiment buckets used by [`MockBackend::analyze`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sentiment {
    Negative,
    Positive,
    RudeStaff,
    Neutral,
}

static SENTIMENT_RULES: LazyLock<Vec<(Regex, Sentiment)>> = LazyLock::new(|| {
    [
        (r"(?i)bad|terrible|long|wait", Sentiment::Negative),
        (r"(?i)good|great|excellent|amazing", Sentiment::Positive),
        (r"(?i)rude|mean|dismissive|ignored", Sentiment::RudeStaff),
    ]
    .into_iter()
    .map(|(p, s)| (Regex::new(p).expect("Invalid sentiment regex"), s))
    .collect()
});

// =============================================================================
// Backend
// =============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }

    /// Reply the mock gives for `history`.
    pub fn reply_for(history: &[ChatTurn]) -> &'static str {
        let user_turns = history.iter().filter(|t| t.role == Role::User).count();
        let replies = select_replies(history, user_turns);
        replies[user_turns % replies.len()]
    }
}

fn select_replies(history: &[ChatTurn], user_turns: usize) -> &'static [&'static str] {
    if user_turns <= 1 {
        return GREETING_REPLIES;
    }

    let latest = history.last().map(|t| t.content.as_str()).unwrap_or_default();
    if let Some(rule) = CHAT_RULES.iter().find(|r| r.pattern.is_match(latest)) {
        return rule.replies;
    }

    match user_turns {
        2 => SECOND_EXCHANGE_REPLIES,
        3 => THIRD_EXCHANGE_REPLIES,
        4 => FOURTH_EXCHANGE_REPLIES,
        _ => LATER_EXCHANGE_REPLIES,
    }
}

/// Classify the patient's side of a transcript.
///
/// Only the patient's turns are considered so the assistant's own wording
/// ("How long did you wait?") cannot drag the result negative. An unlabelled
/// line continues the turn above it, since a single message may span several
/// lines. A transcript without speaker labels is classified as a whole.
pub fn classify_transcript(transcript: &str) -> Sentiment {
    let text = patient_text(transcript).unwrap_or_else(|| transcript.to_string());

    SENTIMENT_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&text))
        .map(|(_, sentiment)| *sentiment)
        .unwrap_or(Sentiment::Neutral)
}

/// Patient turns of a labelled transcript, or `None` when no line carries
/// a speaker label.
fn patient_text(transcript: &str) -> Option<String> {
    let mut labelled = false;
    let mut in_patient_turn = false;
    let mut patient_lines = Vec::new();

    for line in transcript.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("Patient:") {
            labelled = true;
            in_patient_turn = true;
            patient_lines.push(rest);
        } else if trimmed.starts_with("Assistant:") {
            labelled = true;
            in_patient_turn = false;
        } else if in_patient_turn {
            patient_lines.push(line);
        }
    }

    labelled.then(|| patient_lines.join("\n"))
}

fn canned_analysis(sentiment: Sentiment) -> serde_json::Value {
    match sentiment {
        Sentiment::Negative => json!({
            "satisfaction_score": 2,
            "radar_metrics": {
                "felt_heard": 2,
                "concerns_addressed": 2,
                "clear_communication": 3,
                "respect_shown": 3,
                "time_given": 1
            },
            "confidence_in_treatment": "partial",
            "duration_satisfaction": 2,
            "staff_behavior": 3,
            "summary_bullets": [
                "Patient experienced significant wait times",
                "Consultation felt rushed due to delays",
                "Concerns were partially addressed",
                "Recommend reviewing scheduling processes"
            ]
        }),
        Sentiment::Positive => json!({
            "satisfaction_score": 5,
            "radar_metrics": {
                "felt_heard": 5,
                "concerns_addressed": 5,
                "clear_communication": 5,
                "respect_shown": 5,
                "time_given": 5
            },
            "confidence_in_treatment": "yes",
            "duration_satisfaction": 5,
            "staff_behavior": 5,
            "summary_bullets": [
                "Patient highly satisfied with overall care",
                "Staff was attentive and professional",
                "Clear communication throughout visit",
                "Would recommend to others",
                "No concerns or issues raised"
            ]
        }),
        Sentiment::RudeStaff => json!({
            "satisfaction_score": 1,
            "radar_metrics": {
                "felt_heard": 1,
                "concerns_addressed": 2,
                "clear_communication": 2,
                "respect_shown": 1,
                "time_given": 2
            },
            "confidence_in_treatment": "no",
            "duration_satisfaction": 2,
            "staff_behavior": 1,
            "summary_bullets": [
                "Patient felt dismissed by staff",
                "Communication was poor or unclear",
                "Did not feel respected during visit",
                "Urgent follow-up recommended",
                "Consider staff training on patient interactions"
            ]
        }),
        Sentiment::Neutral => json!({
            "satisfaction_score": 3,
            "radar_metrics": {
                "felt_heard": 3,
                "concerns_addressed": 3,
                "clear_communication": 3,
                "respect_shown": 4,
                "time_given": 3
            },
            "confidence_in_treatment": "partial",
            "duration_satisfaction": 3,
            "staff_behavior": 4,
            "summary_bullets": [
                "Patient had a routine healthcare experience",
                "No major concerns raised",
                "Standard care was provided",
                "Continue monitoring for patterns"
            ]
        }),
    }
}

impl ChatBackend for MockBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn chat(&self, history: &[ChatTurn], _system_prompt: &str) -> Result<String, GatewayError> {
        Ok(Self::reply_for(history).to_string())
    }

    fn analyze(&self, transcript: &str, _system_prompt: &str) -> Result<String, GatewayError> {
        Ok(canned_analysis(classify_transcript(transcript)).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(user_messages: &[&str]) -> Vec<ChatTurn> {
        let mut history = vec![ChatTurn::assistant("Hello! How was your visit?")];
        for msg in user_messages {
            history.push(ChatTurn::user(*msg));
            history.push(ChatTurn::assistant("ok"));
        }
        history.pop();
        history
    }

    #[test]
    fn test_first_exchange_uses_greeting_set() {
        let history = conversation(&["It was terrible"]);
        let reply = MockBackend::reply_for(&history);
        assert!(GREETING_REPLIES.contains(&reply));
    }

    #[test]
    fn test_terrible_after_first_exchange_is_negative() {
        let history = conversation(&["Hi", "It was terrible"]);
        let reply = MockBackend::reply_for(&history);
        assert!(NEGATIVE_REPLIES.contains(&reply));
        assert_eq!(reply, NEGATIVE_REPLIES[2 % NEGATIVE_REPLIES.len()]);
    }

    #[test]
    fn test_rule_order_negative_before_wait() {
        let history = conversation(&["Hi", "The wait was bad"]);
        assert!(NEGATIVE_REPLIES.contains(&MockBackend::reply_for(&history)));
    }

    #[test]
    fn test_topic_rules() {
        let cases: [(&str, &[&str]); 6] = [
            ("The nurses were attentive", NURSE_REPLIES),
            ("I saw Dr Patel", DOCTOR_REPLIES),
            ("Booking was a hassle", APPOINTMENT_REPLIES),
            ("The room was spotless", FACILITY_REPLIES),
            ("What about the weather?", OFF_TOPIC_REPLIES),
            ("Everyone was so friendly", FRIENDLY_REPLIES),
        ];
        for (text, expected) in cases {
            let history = conversation(&["Hi", text]);
            assert!(
                expected.contains(&MockBackend::reply_for(&history)),
                "wrong reply set for {text:?}"
            );
        }
    }

    #[test]
    fn test_dr_substring_is_not_doctor() {
        let history = conversation(&["Hi", "They had my address wrong"]);
        assert!(!DOCTOR_REPLIES.contains(&MockBackend::reply_for(&history)));
    }

    #[test]
    fn test_progress_defaults() {
        let reply = MockBackend::reply_for(&conversation(&["Hi", "Fine"]));
        assert!(SECOND_EXCHANGE_REPLIES.contains(&reply));

        let reply = MockBackend::reply_for(&conversation(&["Hi", "Fine", "Okay"]));
        assert!(THIRD_EXCHANGE_REPLIES.contains(&reply));

        let reply = MockBackend::reply_for(&conversation(&["Hi", "Fine", "Okay", "Yes"]));
        assert!(FOURTH_EXCHANGE_REPLIES.contains(&reply));

        let reply = MockBackend::reply_for(&conversation(&["a", "b", "c", "d", "e", "f"]));
        assert!(LATER_EXCHANGE_REPLIES.contains(&reply));
    }

    #[test]
    fn test_reply_is_deterministic() {
        let history = conversation(&["Hi", "It was great"]);
        assert_eq!(
            MockBackend::reply_for(&history),
            MockBackend::reply_for(&history)
        );
    }

    #[test]
    fn test_empty_history_gets_greeting() {
        assert!(GREETING_REPLIES.contains(&MockBackend::reply_for(&[])));
    }

    #[test]
    fn test_classify_uses_patient_lines() {
        let transcript = "Assistant: How long did you wait?\nPatient: The care was excellent";
        assert_eq!(classify_transcript(transcript), Sentiment::Positive);
    }

    #[test]
    fn test_classify_keeps_multiline_patient_turn() {
        let transcript = "Assistant: How was your visit?\n\
                          Patient: Thanks for asking.\n\
                          The nurse ignored me and was rude\n\
                          Assistant: I'm sorry to hear that.";
        assert_eq!(classify_transcript(transcript), Sentiment::RudeStaff);
    }

    #[test]
    fn test_classify_skips_multiline_assistant_turn() {
        let transcript = "Assistant: Did you have a long wait?\n\
                          Was anything bad?\n\
                          Patient: The care was excellent";
        assert_eq!(classify_transcript(transcript), Sentiment::Positive);
    }

    #[test]
    fn test_classify_whole_text_without_labels() {
        assert_eq!(classify_transcript("a terrible visit"), Sentiment::Negative);
        assert_eq!(classify_transcript("they ignored me"), Sentiment::RudeStaff);
        assert_eq!(classify_transcript("it was fine"), Sentiment::Neutral);
    }

    #[test]
    fn test_classify_negative_checked_first() {
        let transcript = "Patient: The wait was long and the doctor was rude";
        assert_eq!(classify_transcript(transcript), Sentiment::Negative);
    }

    #[test]
    fn test_analyze_returns_json() {
        let raw = MockBackend::new()
            .analyze("Patient: staff were dismissive", "prompt")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["satisfaction_score"], 1);
        assert_eq!(value["confidence_in_treatment"], "no");
        assert_eq!(value["summary_bullets"].as_array().unwrap().len(), 5);
    }
}
