/// Single Copilot CLI invocation: spawn the subprocess in the configured
/// working directory, enforce the wall-clock timeout, and capture
/// stdout+stderr as one text blob.
use crate::config::RoleConfig;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Text captured from a finished CLI run.
#[derive(Debug)]
pub struct CapturedOutput {
    /// Stdout followed by stderr.
    pub text: String,
    /// Process exit code (None if killed by signal).
    pub exit_code: Option<i32>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Failures running the CLI. Messages are shown to the eval harness as-is.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("{label} timed out after {secs}s")]
    Timeout { label: String, secs: u64 },
    #[error("{label} CLI not found. Install with: {hint}")]
    NotFound { label: String, hint: String },
    #[error("{label} exited with code {code}")]
    NonZeroExit { label: String, code: i32 },
    #[error(transparent)]
    Unexpected(#[from] std::io::Error),
}

/// Build the command arguments, replacing `{model}` and `{prompt}` placeholders.
fn build_args(role: &RoleConfig, prompt: &str) -> Vec<String> {
    role.args
        .iter()
        .map(|arg| arg.replace("{model}", &role.model).replace("{prompt}", prompt))
        .collect()
}

/// Render the command line for dry runs and logs.
pub fn describe_command(role: &RoleConfig, prompt: &str) -> String {
    let mut parts = vec![role.command.clone()];
    parts.extend(build_args(role, prompt));
    parts.join(" ")
}

/// Run the CLI for one role and capture its combined output.
///
/// A non-zero exit that still printed something is not an error: the
/// text is returned and the caller parses it like any other answer.
pub async fn run_copilot(
    role: &RoleConfig,
    working_dir: &Path,
    prompt: &str,
) -> Result<CapturedOutput, InvocationError> {
    if !working_dir.is_dir() {
        return Err(InvocationError::Unexpected(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("working directory {} does not exist", working_dir.display()),
        )));
    }

    let args = build_args(role, prompt);
    tracing::info!(
        command = %role.command,
        model = %role.model,
        cwd = %working_dir.display(),
        timeout_secs = role.timeout_secs,
        "spawning copilot"
    );

    let start = Instant::now();

    let child = Command::new(&role.command)
        .args(&args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InvocationError::NotFound {
                    label: role.label.clone(),
                    hint: role.install_hint.clone(),
                }
            } else {
                InvocationError::Unexpected(e)
            }
        })?;

    let pid = child.id().unwrap_or(0);
    tracing::debug!(pid, "copilot subprocess started");

    // Dropping the wait future on timeout drops the child, which kills it.
    let timeout = Duration::from_secs(role.timeout_secs);
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(pid, timeout_secs = role.timeout_secs, "copilot timed out");
            return Err(InvocationError::Timeout {
                label: role.label.clone(),
                secs: role.timeout_secs,
            });
        }
    };

    let duration = start.elapsed();
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    let exit_code = output.status.code();
    tracing::info!(
        exit_code = ?exit_code,
        output_bytes = text.len(),
        duration_ms = duration.as_millis() as u64,
        "copilot finished"
    );

    if !output.status.success() && text.trim().is_empty() {
        return Err(InvocationError::NonZeroExit {
            label: role.label.clone(),
            code: exit_code.unwrap_or(-1),
        });
    }

    Ok(CapturedOutput {
        text,
        exit_code,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> RoleConfig {
        RoleConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ..RoleConfig::default()
        }
    }

    #[test]
    fn test_build_args_replaces_placeholders() {
        let role = RoleConfig {
            model: "gpt-5-mini".to_string(),
            ..RoleConfig::default()
        };
        let args = build_args(&role, "list files");
        assert_eq!(
            args,
            vec!["copilot", "suggest", "-t", "shell", "--model", "gpt-5-mini", "list files"]
        );
    }

    #[test]
    fn test_build_args_multiple_placeholders() {
        let role = RoleConfig {
            args: vec!["{prompt}".into(), "mid".into(), "{prompt}".into()],
            ..RoleConfig::default()
        };
        assert_eq!(build_args(&role, "X"), vec!["X", "mid", "X"]);
    }

    #[test]
    fn test_describe_command() {
        let role = RoleConfig::judge();
        assert_eq!(
            describe_command(&role, "grade"),
            "gh copilot explain --model gpt-5-mini grade"
        );
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let role = RoleConfig {
            command: "echo".to_string(),
            args: vec!["hello".to_string(), "{prompt}".to_string()],
            ..RoleConfig::default()
        };
        let out = run_copilot(&role, dir.path(), "world").await.unwrap();
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.text.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_run_appends_stderr_after_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let role = sh("echo stderr-line >&2; echo stdout-line");
        let out = run_copilot(&role, dir.path(), "unused").await.unwrap();
        assert_eq!(out.text, "stdout-line\nstderr-line\n");
    }

    #[tokio::test]
    async fn test_run_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_copilot(&sh("pwd"), dir.path(), "unused").await.unwrap();
        assert_eq!(
            std::fs::canonicalize(out.text.trim()).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_without_output_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_copilot(&sh("exit 42"), dir.path(), "unused")
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::NonZeroExit { code: 42, .. }));
        assert_eq!(err.to_string(), "gh copilot exited with code 42");
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_with_output_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_copilot(&sh("echo partial answer; exit 3"), dir.path(), "unused")
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.text, "partial answer\n");
    }

    #[tokio::test]
    async fn test_run_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let role = RoleConfig {
            command: "nonexistent-binary-xyz".to_string(),
            ..RoleConfig::default()
        };
        let err = run_copilot(&role, dir.path(), "unused").await.unwrap_err();
        assert!(matches!(err, InvocationError::NotFound { .. }));
        assert_eq!(
            err.to_string(),
            "gh copilot CLI not found. Install with: gh extension install github/gh-copilot"
        );
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let role = RoleConfig {
            timeout_secs: 1,
            label: "Rubric judge".to_string(),
            ..sh("sleep 5")
        };
        let start = Instant::now();
        let err = run_copilot(&role, dir.path(), "unused").await.unwrap_err();
        assert!(matches!(err, InvocationError::Timeout { secs: 1, .. }));
        assert_eq!(err.to_string(), "Rubric judge timed out after 1s");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_run_missing_working_dir() {
        let err = run_copilot(&sh("true"), Path::new("/nonexistent-dir/xyz"), "unused")
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::Unexpected(_)));
        assert!(err.to_string().contains("/nonexistent-dir/xyz"));
    }
}
