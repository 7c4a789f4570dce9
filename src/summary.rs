/// Turns raw Copilot CLI output into the answer text plus structured usage.
use crate::tokens::TokenCountError;
use crate::usage::{parse_usage_block, split_usage_block, UsageSummary};
use serde::Serialize;
use serde_json::{Map, Value};

/// Token usage of the primary (first listed) model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub cached: u64,
    /// `prompt + completion`; cached tokens are not counted.
    pub total: u64,
}

/// Answer content separated from its usage telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedResult {
    pub content: String,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

/// Split the answer from the usage block and decode the block.
pub fn summarize(raw: &str) -> Result<ParsedResult, TokenCountError> {
    let (content, block) = split_usage_block(raw);
    let summary = if block.is_empty() {
        UsageSummary::default()
    } else {
        parse_usage_block(block)?
    };

    let mut metadata = Map::new();
    if let Some(est) = summary.total_usage_est {
        metadata.insert("total_usage_est".into(), Value::String(est));
    }
    if let Some(secs) = summary.api_time_seconds {
        insert_seconds(&mut metadata, "api_time_seconds", secs);
    }
    if let Some(secs) = summary.session_time_seconds {
        insert_seconds(&mut metadata, "session_time_seconds", secs);
    }
    if let Some(additions) = summary.code_additions {
        metadata.insert("code_additions".into(), Value::from(additions));
    }
    if let Some(deletions) = summary.code_deletions {
        metadata.insert("code_deletions".into(), Value::from(deletions));
    }

    let token_usage = summary.models.first().map(|primary| TokenUsage {
        prompt: primary.tokens_in,
        completion: primary.tokens_out,
        cached: primary.tokens_cached,
        total: primary.tokens_in.saturating_add(primary.tokens_out),
    });

    if let Some(primary) = summary.models.first() {
        metadata.insert("model".into(), Value::String(primary.model.clone()));
    }
    if summary.models.len() > 1 {
        let breakdown = serde_json::to_value(&summary.models).unwrap_or(Value::Null);
        metadata.insert("model_breakdown".into(), breakdown);
    }

    Ok(ParsedResult {
        content: content.to_string(),
        metadata,
        token_usage,
    })
}

/// Content-only mode: drop the usage block without decoding it.
pub fn strip_usage_block(raw: &str) -> &str {
    split_usage_block(raw).0
}

fn insert_seconds(metadata: &mut Map<String, Value>, key: &str, secs: f64) {
    if let Some(n) = serde_json::Number::from_f64(secs) {
        metadata.insert(key.into(), Value::Number(n));
    }
}
