//! Structured analysis of a finished transcript.

use carelog_core::config::PromptConfig;
use carelog_core::types::RatingRecord;
use carelog_gateway::ModelGateway;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::normalizer::{normalize, render_display};

pub const PARSE_FAILED_BULLET: &str = "Analysis failed to parse.";
pub const GATEWAY_FAILED_BULLET: &str =
    "Analysis unavailable: the language model could not be reached.";

/// Result of analyzing one conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub record: RatingRecord,
    /// [`render_display`] of `record`.
    pub display: String,
    /// True when the record is a neutral placeholder rather than the
    /// model's assessment.
    pub degraded: bool,
}

impl AnalysisOutcome {
    fn new(record: RatingRecord, degraded: bool) -> Self {
        let display = render_display(&record);
        Self {
            record,
            display,
            degraded,
        }
    }
}

/// Analyze `transcript` and normalize the result.
///
/// Never fails: gateway and parse errors yield a degraded neutral record.
pub fn run_analysis(
    gateway: &ModelGateway,
    transcript: &str,
    prompts: &PromptConfig,
) -> AnalysisOutcome {
    let message = prompts.analysis_message(transcript);

    let raw = match gateway.analyze(&message, &prompts.analysis) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(provider = %gateway.kind(), error = %e, "Analysis request failed");
            return AnalysisOutcome::new(degraded_record(GATEWAY_FAILED_BULLET), true);
        }
    };

    match parse_analysis(&raw) {
        Ok(value) => AnalysisOutcome::new(normalize(&value), false),
        Err(e) => {
            warn!(provider = %gateway.kind(), error = %e, "Analysis output was not valid JSON");
            debug!(raw = %raw, "Unparseable analysis output");
            AnalysisOutcome::new(degraded_record(PARSE_FAILED_BULLET), true)
        }
    }
}

/// Parse model output as JSON, tolerating a surrounding Markdown code fence.
pub fn parse_analysis(raw: &str) -> Result<serde_json::Value, ChatError> {
    Ok(serde_json::from_str(strip_code_fences(raw))?)
}

/// Remove a leading ```` ```json ```` or ```` ``` ```` line and a trailing
/// ```` ``` ````.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn degraded_record(bullet: &str) -> RatingRecord {
    RatingRecord {
        summary_bullets: vec![bullet.to_string()],
        ..RatingRecord::default()
    }
}
