/// Eval-harness provider: runs Copilot for a prompt and reshapes the result
/// into the response envelope the harness expects.
use crate::config::{ProviderConfig, RoleConfig};
use crate::session::run_copilot;
use crate::summary::{strip_usage_block, summarize, ParsedResult, TokenUsage};
use serde::Serialize;
use serde_json::{Map, Value};

/// `{"output": ..., "tokenUsage": ..., "metadata": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(rename = "tokenUsage", skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn content(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Default::default()
        }
    }
}

impl From<ParsedResult> for ProviderResponse {
    fn from(parsed: ParsedResult) -> Self {
        Self {
            output: Some(parsed.content),
            token_usage: parsed.token_usage,
            metadata: (!parsed.metadata.is_empty()).then_some(parsed.metadata),
            error: None,
        }
    }
}

/// Which half of the pipeline a role's output goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Answer plus decoded usage stats.
    Full,
    /// Answer only; the usage block is dropped undecoded.
    ContentOnly,
}

/// Copilot-backed provider configured once at construction.
pub struct CopilotProvider {
    config: ProviderConfig,
}

impl CopilotProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Answer a test prompt, reporting token usage and timing metadata.
    pub async fn call_api(&self, prompt: &str) -> ProviderResponse {
        self.run(&self.config.provider, prompt, OutputMode::Full).await
    }

    /// Grade a rubric prompt. Only the judge's verdict text is returned.
    pub async fn judge(&self, prompt: &str) -> ProviderResponse {
        self.run(&self.config.judge, prompt, OutputMode::ContentOnly)
            .await
    }

    async fn run(&self, role: &RoleConfig, prompt: &str, mode: OutputMode) -> ProviderResponse {
        let working_dir = self.config.working_dir();
        let captured = match run_copilot(role, &working_dir, prompt).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, label = %role.label, "copilot invocation failed");
                return ProviderResponse::error(e.to_string());
            }
        };
        tracing::debug!(
            exit_code = ?captured.exit_code,
            duration_ms = captured.duration.as_millis() as u64,
            "shaping copilot output"
        );
        shape_response(&captured.text, mode)
    }
}

/// Turn captured CLI text into a response envelope.
pub fn shape_response(raw: &str, mode: OutputMode) -> ProviderResponse {
    match mode {
        OutputMode::ContentOnly => ProviderResponse::content(strip_usage_block(raw)),
        OutputMode::Full => match summarize(raw) {
            Ok(parsed) => parsed.into(),
            Err(e) => {
                tracing::warn!(error = %e, "usage block has an undecodable token count");
                ProviderResponse::error(e.to_string())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OUTPUT: &str = "\
git log --oneline -5

Total usage est: 1 Premium request
API time spent: 3s
Total session time: 1m5s
Breakdown by AI model:
  gpt-5.2-codex    2.5k in, 40 out, 0 cached ( Est. 1 Premium request)
";

    fn scripted(script: &str) -> RoleConfig {
        RoleConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ..RoleConfig::default()
        }
    }

    fn provider_with(
        provider: RoleConfig,
        judge: RoleConfig,
        dir: &std::path::Path,
    ) -> CopilotProvider {
        CopilotProvider::new(ProviderConfig {
            working_dir: Some(dir.to_path_buf()),
            provider,
            judge,
        })
    }

    #[test]
    fn test_full_envelope_shape() {
        let value = serde_json::to_value(shape_response(OUTPUT, OutputMode::Full)).unwrap();
        assert_eq!(
            value,
            json!({
                "output": "git log --oneline -5",
                "tokenUsage": {"prompt": 2500, "completion": 40, "cached": 0, "total": 2540},
                "metadata": {
                    "total_usage_est": "1 Premium request",
                    "api_time_seconds": 3.0,
                    "session_time_seconds": 65.0,
                    "model": "gpt-5.2-codex",
                },
            })
        );
    }

    #[test]
    fn test_plain_output_has_only_output_field() {
        let value = serde_json::to_value(shape_response("just text", OutputMode::Full)).unwrap();
        assert_eq!(value, json!({"output": "just text"}));
    }

    #[test]
    fn test_content_only_drops_block() {
        let response = shape_response(OUTPUT, OutputMode::ContentOnly);
        assert_eq!(response, ProviderResponse::content("git log --oneline -5"));
    }

    #[test]
    fn test_malformed_count_becomes_error_envelope() {
        let raw = "answer\nTotal usage est: 1\n  gpt-5    1..2k in, 1 out, 0 cached\n";
        let response = shape_response(raw, OutputMode::Full);
        assert!(response.output.is_none());
        assert!(response.error.unwrap().contains("1..2k"));
    }

    #[test]
    fn test_error_envelope_shape() {
        let value = serde_json::to_value(ProviderResponse::error("boom")).unwrap();
        assert_eq!(value, json!({"error": "boom"}));
    }

    #[tokio::test]
    async fn test_call_api_parses_usage() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("printf '%s' '{OUTPUT}'");
        let provider = provider_with(scripted(&script), RoleConfig::judge(), dir.path());
        let response = provider.call_api("show recent commits").await;
        assert_eq!(response.output.as_deref(), Some("git log --oneline -5"));
        assert_eq!(response.token_usage.unwrap().total, 2540);
        assert_eq!(response.metadata.unwrap()["model"], "gpt-5.2-codex");
    }

    #[tokio::test]
    async fn test_judge_strips_usage() {
        let dir = tempfile::tempdir().unwrap();
        let judge = RoleConfig {
            label: "Rubric judge".to_string(),
            ..scripted("echo PASS: meets rubric; echo 'Total usage est: 1 Premium request'")
        };
        let provider = provider_with(RoleConfig::default(), judge, dir.path());
        let response = provider.judge("grade this").await;
        assert_eq!(response, ProviderResponse::content("PASS: meets rubric"));
    }

    #[tokio::test]
    async fn test_judge_failure_uses_label() {
        let dir = tempfile::tempdir().unwrap();
        let judge = RoleConfig {
            label: "Rubric judge".to_string(),
            ..scripted("exit 1")
        };
        let provider = provider_with(RoleConfig::default(), judge, dir.path());
        let response = provider.judge("grade this").await;
        assert_eq!(response, ProviderResponse::error("Rubric judge exited with code 1"));
    }

    #[tokio::test]
    async fn test_call_api_missing_cli() {
        let dir = tempfile::tempdir().unwrap();
        let role = RoleConfig {
            command: "definitely-not-gh-xyz".to_string(),
            ..RoleConfig::default()
        };
        let provider = provider_with(role, RoleConfig::judge(), dir.path());
        let response = provider.call_api("anything").await;
        assert!(response.error.unwrap().contains("gh extension install github/gh-copilot"));
    }
}
