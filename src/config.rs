use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Model override for the answering role.
pub const MODEL_ENV: &str = "COPILOT_MODEL";
/// Model override for the rubric judge role.
pub const RUBRIC_MODEL_ENV: &str = "COPILOT_RUBRIC_MODEL";
/// Working directory override for the spawned CLI.
pub const CWD_ENV: &str = "TEST_CWD";

/// Resolved configuration: file values over defaults, then environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Directory the CLI runs in. `None` means the current directory.
    pub working_dir: Option<PathBuf>,
    pub provider: RoleConfig,
    pub judge: RoleConfig,
}

/// How to invoke the Copilot CLI for one role.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleConfig {
    pub command: String,
    /// Argument templates; `{model}` and `{prompt}` are substituted.
    pub args: Vec<String>,
    pub model: String,
    pub timeout_secs: u64,
    /// Name used in error messages, e.g. "gh copilot".
    pub label: String,
    pub install_hint: String,
}

/// On-disk shape of copilot-provider.toml. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    working_dir: Option<PathBuf>,
    provider: RoleOverrides,
    judge: RoleOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RoleOverrides {
    command: Option<String>,
    args: Option<Vec<String>>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    label: Option<String>,
    install_hint: Option<String>,
}

impl RoleOverrides {
    fn apply(self, mut role: RoleConfig) -> RoleConfig {
        if let Some(command) = self.command {
            role.command = command;
        }
        if let Some(args) = self.args {
            role.args = args;
        }
        if let Some(model) = self.model {
            role.model = model;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            role.timeout_secs = timeout_secs;
        }
        if let Some(label) = self.label {
            role.label = label;
        }
        if let Some(install_hint) = self.install_hint {
            role.install_hint = install_hint;
        }
        role
    }
}

/// Errors loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ProviderConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            working_dir: file.working_dir,
            provider: file.provider.apply(RoleConfig::default()),
            judge: file.judge.apply(RoleConfig::judge()),
        })
    }

    /// Apply environment overrides; `lookup` returns a variable's value if set.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(model) = non_empty(MODEL_ENV) {
            self.provider.model = model;
        }
        if let Some(model) = non_empty(RUBRIC_MODEL_ENV) {
            self.judge.model = model;
        }
        if let Some(dir) = non_empty(CWD_ENV) {
            self.working_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Resolved working directory for the spawned CLI.
    pub fn working_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

// --- Default implementations ---

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            provider: RoleConfig::default(),
            judge: RoleConfig::judge(),
        }
    }
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            command: "gh".to_string(),
            args: vec![
                "copilot".to_string(),
                "suggest".to_string(),
                "-t".to_string(),
                "shell".to_string(),
                "--model".to_string(),
                "{model}".to_string(),
                "{prompt}".to_string(),
            ],
            model: "gpt-5.2-codex".to_string(),
            timeout_secs: 120,
            label: "gh copilot".to_string(),
            install_hint: "gh extension install github/gh-copilot".to_string(),
        }
    }
}

impl RoleConfig {
    /// Defaults for the rubric judge: `gh copilot explain` on a lighter model.
    pub fn judge() -> Self {
        Self {
            args: vec![
                "copilot".to_string(),
                "explain".to_string(),
                "--model".to_string(),
                "{model}".to_string(),
                "{prompt}".to_string(),
            ],
            model: "gpt-5-mini".to_string(),
            timeout_secs: 60,
            label: "Rubric judge".to_string(),
            ..Self::default()
        }
    }
}
