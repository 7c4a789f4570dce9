/// Copilot usage summary: locating and parsing the trailing stats block.
///
/// The Copilot CLI appends a block like this after its answer:
///
/// ```text
/// Total usage est: 1 Premium request
/// API time spent:  2s
/// Total session time: 9s
/// Total code changes: 0+ 0-
/// Breakdown by AI model:
///   gpt-5.2-codex    14.3k in, 21 out, 1.7k cached ( Est. 1 Premium request)
/// ```
///
/// Field order and presence vary between CLI versions, so every field is
/// anchored on its own label and extracted independently.
use crate::duration::parse_seconds;
use crate::tokens::{parse_token_count, TokenCountError};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Label that opens the usage block.
pub const USAGE_MARKER: &str = "Total usage est:";

static TOTAL_USAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total usage est:[ \t]*([^\r\n]+)").unwrap());
static API_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"API time spent:[ \t]*(\S+)").unwrap());
static SESSION_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total session time:[ \t]*(\S+)").unwrap());
static CODE_CHANGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total code changes:[ \t]*(\d+)\+[ \t]*(\d+)-").unwrap());
static MODEL_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(\S+)[ \t]+([\d.]+[km]?)[ \t]+in,[ \t]+([\d.]+[km]?)[ \t]+out,[ \t]+([\d.]+[km]?)[ \t]+cached",
    )
    .unwrap()
});

/// One model's line in the "Breakdown by AI model" table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelBreakdown {
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub tokens_cached: u64,
}

/// Fields extracted from a usage block. Absent in text means `None` here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageSummary {
    /// Free-form estimate, e.g. "1 Premium request".
    pub total_usage_est: Option<String>,
    pub api_time_seconds: Option<f64>,
    pub session_time_seconds: Option<f64>,
    pub code_additions: Option<u64>,
    pub code_deletions: Option<u64>,
    /// Breakdown rows in source order; the first is the primary model.
    pub models: Vec<ModelBreakdown>,
}

/// Split raw CLI output into (content, usage block).
///
/// Without a marker the whole input is content and the block is empty.
/// Otherwise content is everything before the first marker with trailing
/// whitespace removed, and the block runs from the marker to the end.
pub fn split_usage_block(raw: &str) -> (&str, &str) {
    match raw.find(USAGE_MARKER) {
        Some(idx) => (raw[..idx].trim_end(), &raw[idx..]),
        None => (raw, ""),
    }
}

/// Extract every recognizable field from a usage block.
///
/// Missing or unmatched fields are simply left empty. The only failure is a
/// breakdown row whose count matched the row shape but is not a number.
pub fn parse_usage_block(block: &str) -> Result<UsageSummary, TokenCountError> {
    let mut summary = UsageSummary::default();

    if let Some(caps) = TOTAL_USAGE.captures(block) {
        let est = caps[1].trim();
        if !est.is_empty() {
            summary.total_usage_est = Some(est.to_string());
        }
    }

    if let Some(caps) = API_TIME.captures(block) {
        summary.api_time_seconds = Some(parse_seconds(&caps[1]));
    }

    if let Some(caps) = SESSION_TIME.captures(block) {
        summary.session_time_seconds = Some(parse_seconds(&caps[1]));
    }

    if let Some(caps) = CODE_CHANGES.captures(block) {
        // Both halves or neither.
        if let (Ok(additions), Ok(deletions)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) {
            summary.code_additions = Some(additions);
            summary.code_deletions = Some(deletions);
        }
    }

    for caps in MODEL_ROW.captures_iter(block) {
        summary.models.push(ModelBreakdown {
            model: caps[1].to_string(),
            tokens_in: parse_token_count(&caps[2])?,
            tokens_out: parse_token_count(&caps[3])?,
            tokens_cached: parse_token_count(&caps[4])?,
        });
    }

    tracing::debug!(
        total_usage_est = ?summary.total_usage_est,
        api_time_seconds = ?summary.api_time_seconds,
        session_time_seconds = ?summary.session_time_seconds,
        models = summary.models.len(),
        "parsed usage block"
    );

    Ok(summary)
}
