//! Turns arbitrary model output into a valid [`RatingRecord`].
//!
//! [`normalize`] is total: any JSON value, however malformed, produces a
//! record whose scores are within 1-5 and whose summary holds 1-5 non-empty
//! bullets.

use carelog_core::types::{
    Confidence, RadarMetrics, RatingRecord, MAX_SUMMARY_BULLETS, NO_FEEDBACK_BULLET, SCORE_MAX,
    SCORE_MIDPOINT, SCORE_MIN,
};
use serde_json::{json, Map, Value};

/// Normalize raw analysis output.
pub fn normalize(raw: &Value) -> RatingRecord {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    RatingRecord {
        satisfaction_score: score(obj.get("satisfaction_score")),
        radar_metrics: radar(obj.get("radar_metrics")),
        confidence_in_treatment: confidence(obj.get("confidence_in_treatment")),
        duration_satisfaction: score(obj.get("duration_satisfaction")),
        staff_behavior: score(obj.get("staff_behavior")),
        summary_bullets: bullets(obj.get("summary_bullets")),
    }
}

/// Plain JSON projection of a record; `normalize(&to_value(r)) == r`.
pub fn to_value(record: &RatingRecord) -> Value {
    let radar = &record.radar_metrics;
    json!({
        "satisfaction_score": record.satisfaction_score,
        "radar_metrics": {
            "felt_heard": radar.felt_heard,
            "concerns_addressed": radar.concerns_addressed,
            "clear_communication": radar.clear_communication,
            "respect_shown": radar.respect_shown,
            "time_given": radar.time_given,
        },
        "confidence_in_treatment": record.confidence_in_treatment.as_str(),
        "duration_satisfaction": record.duration_satisfaction,
        "staff_behavior": record.staff_behavior,
        "summary_bullets": record.summary_bullets,
    })
}

// =============================================================================
// Field rules
// =============================================================================

fn score(value: Option<&Value>) -> u8 {
    let Some(n) = value.and_then(coerce_number) else {
        return SCORE_MIDPOINT;
    };
    let truncated = n.trunc();
    if truncated <= f64::from(SCORE_MIN) {
        SCORE_MIN
    } else if truncated >= f64::from(SCORE_MAX) {
        SCORE_MAX
    } else {
        truncated as u8
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn radar(value: Option<&Value>) -> RadarMetrics {
    let Some(obj) = value.and_then(Value::as_object) else {
        return RadarMetrics::default();
    };
    RadarMetrics {
        felt_heard: score(obj.get("felt_heard")),
        concerns_addressed: score(obj.get("concerns_addressed")),
        clear_communication: score(obj.get("clear_communication")),
        respect_shown: score(obj.get("respect_shown")),
        time_given: score(obj.get("time_given")),
    }
}

fn confidence(value: Option<&Value>) -> Confidence {
    let text = match value {
        Some(Value::String(s)) => s.trim().to_lowercase(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return Confidence::Partial,
    };
    match text.as_str() {
        "yes" | "y" | "true" | "1" => Confidence::Yes,
        "no" | "n" | "false" | "0" => Confidence::No,
        _ => Confidence::Partial,
    }
}

fn bullets(value: Option<&Value>) -> Vec<String> {
    let cleaned: Vec<String> = match value {
        Some(Value::String(s)) => s.split(',').map(clean_text).collect(),
        Some(Value::Array(items)) => items.iter().map(stringify).map(|s| clean_text(&s)).collect(),
        _ => Vec::new(),
    };

    let mut kept: Vec<String> = cleaned
        .into_iter()
        .filter(|s| !s.is_empty())
        .take(MAX_SUMMARY_BULLETS)
        .collect();
    if kept.is_empty() {
        kept.push(NO_FEEDBACK_BULLET.to_string());
    }
    kept
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Display
// =============================================================================

const BANNER: &str = "==========================================";

/// Human-readable rendering of a record for terminals and logs.
pub fn render_display(record: &RatingRecord) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    out.push_str("\n        PATIENT FEEDBACK SUMMARY\n");
    out.push_str(BANNER);
    out.push('\n');

    out.push_str(&format!(
        "Satisfaction Score: {}/{} {}\n",
        record.satisfaction_score,
        SCORE_MAX,
        stars(record.satisfaction_score)
    ));

    out.push_str("\nRadar Metrics:\n");
    for (axis, value) in RadarMetrics::AXES.iter().zip(record.radar_metrics.values()) {
        out.push_str(&format!("  {:<22}{}/{}\n", axis_label(axis), value, SCORE_MAX));
    }

    out.push_str(&format!(
        "\nConfidence in Treatment: {}\n",
        record.confidence_in_treatment.as_str().to_uppercase()
    ));
    out.push_str(&format!(
        "Duration Satisfaction: {}/{}\n",
        record.duration_satisfaction, SCORE_MAX
    ));
    out.push_str(&format!(
        "Staff Behavior: {}/{}\n",
        record.staff_behavior, SCORE_MAX
    ));

    out.push_str("\nSummary:\n");
    for (i, bullet) in record.summary_bullets.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, bullet));
    }
    out.push_str(BANNER);
    out
}

fn stars(score: u8) -> String {
    let filled = usize::from(score.min(SCORE_MAX));
    let empty = usize::from(SCORE_MAX) - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

fn axis_label(axis: &str) -> &'static str {
    match axis {
        "felt_heard" => "Felt Heard:",
        "concerns_addressed" => "Concerns Addressed:",
        "clear_communication" => "Clear Communication:",
        "respect_shown" => "Respect Shown:",
        "time_given" => "Time Given:",
        _ => "Other:",
    }
}
