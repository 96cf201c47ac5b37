use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Global runtime configuration, loaded from TOML with environment variable
/// overrides. Per-agent values (model, hosting) may be overridden in an
/// individual `AgentState`'s instruction details; these are only the
/// system-wide defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Max non-system records kept in a conversation window before trimming.
    /// Exposed on the wire/TOML as `conversation_length` per spec; internally
    /// this is `max_conversation_history` in the windowing invariants.
    pub conversation_length: usize,
    /// How many of the most recent records are exempt from summarization.
    /// A value of `-1` disables summarization entirely.
    pub detail_length: i64,
    pub max_learnings_history: usize,
    pub hosting: String,
    pub model: String,
    pub auto_save_conversation: bool,
    /// Root directory for persisted agent state. Defaults to
    /// `~/.local-operator`, recovered from the original implementation's
    /// config directory convention.
    pub config_dir: PathBuf,
    /// Per-action retry cap for CodeExecution errors before surfacing ERROR.
    pub max_action_retries: u32,
    /// Seconds to wait for a human override in prompt-user safety mode.
    pub safety_prompt_timeout_secs: u64,
    /// Seconds a pending out-of-band confirmation stays valid before expiry.
    pub confirmation_timeout_secs: u64,
    /// Selects the Safety Auditor's mode: `true` runs prompt-user (blocks on
    /// a terminal y/n for each UNSAFE verdict), `false` runs
    /// conversation-confirm (never blocks, surfaces `CONFIRMATION_REQUIRED`
    /// instead). Only meaningful when the process has an interactive
    /// terminal attached; server deployments should set this to `false`.
    pub can_prompt_user: bool,
    /// Optional provider endpoints gating which built-in tools the registry
    /// exposes — a tool is only registered when its dependency is configured.
    pub tool_providers: ToolProviderConfig,
    /// HTTP server binding, CORS, and bearer-token settings.
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conversation_length: 50,
            detail_length: 10,
            max_learnings_history: 20,
            hosting: "openrouter".to_string(),
            model: "default".to_string(),
            auto_save_conversation: true,
            config_dir: default_config_dir(),
            max_action_retries: 3,
            safety_prompt_timeout_secs: 300,
            confirmation_timeout_secs: 600,
            can_prompt_user: false,
            tool_providers: ToolProviderConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// HTTP server binding, CORS, and bearer-token settings. The workspace root
/// for agent file actions is `config_dir` itself (see [`Config::config_dir`])
/// rather than a separate field — agents get their own subdirectory from the
/// agent registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. An entry of `*` allows any origin; an entry
    /// like `http://localhost:*` allows any port on that host.
    pub cors_allowed_origins: Vec<String>,
    /// Env var holding the bearer token clients must present on protected
    /// routes. Unset disables API token enforcement (local/dev use).
    pub api_token_env: Option<String>,
    /// Env var holding a separate bearer token for admin-only routes.
    pub admin_token_env: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1234,
            cors_allowed_origins: vec!["http://localhost:*".to_string()],
            api_token_env: None,
            admin_token_env: None,
        }
    }
}

/// A named HTTP API endpoint, resolved the same way as LLM credentials:
/// a plaintext key takes precedence over `api_key_env`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
}

/// Optional external dependencies for the built-in tool set. `search_web`
/// fails over from `search_primary` to `search_secondary`; `generate_image`
/// and `generate_altered_image` both require `image_provider`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ToolProviderConfig {
    pub search_primary: Option<ProviderEndpoint>,
    pub search_secondary: Option<ProviderEndpoint>,
    pub image_provider: Option<ProviderEndpoint>,
    /// Default WSL distribution for `execute_wsl_command` when the caller
    /// omits one.
    pub wsl_default_distribution: Option<String>,
}

fn default_config_dir() -> PathBuf {
    dirs_config_dir().unwrap_or_else(|| PathBuf::from(".local-operator"))
}

fn dirs_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".local-operator"))
}

impl Config {
    /// `detail_length == -1` disables per-record summarization entirely.
    pub fn summarization_disabled(&self) -> bool {
        self.detail_length < 0
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut config: Config =
            toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Env overrides follow the teacher's `LOP_<FIELD>` convention.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LOP_CONVERSATION_LENGTH") {
            if let Ok(n) = v.parse() {
                self.conversation_length = n;
            }
        }
        if let Ok(v) = std::env::var("LOP_DETAIL_LENGTH") {
            if let Ok(n) = v.parse() {
                self.detail_length = n;
            }
        }
        if let Ok(v) = std::env::var("LOP_HOSTING") {
            self.hosting = v;
        }
        if let Ok(v) = std::env::var("LOP_MODEL") {
            self.model = v;
        }
        if let Ok(v) = std::env::var("LOP_CONFIG_DIR") {
            self.config_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LOP_SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("LOP_SERVER_PORT") {
            if let Ok(n) = v.parse() {
                self.server.port = n;
            }
        }
    }

    /// Sanity-check the resolved configuration. Never fails to load a
    /// config on its own — callers decide whether an `Error`-severity
    /// issue should block startup (`doctor`, `config validate`).
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.conversation_length == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "conversation_length must be greater than 0".to_string(),
            });
        }
        if self.max_learnings_history == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "max_learnings_history is 0 — learnings will never be retained"
                    .to_string(),
            });
        }
        if self.hosting.trim().is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "hosting must not be empty".to_string(),
            });
        }
        if self.server.api_token_env.is_none() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "server.api_token_env is unset — the API will run without bearer-token auth"
                    .to_string(),
            });
        }

        issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

/// One finding from [`Config::validate`].
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Warning => "warning",
            ConfigSeverity::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_summarization_enabled() {
        let config = Config::default();
        assert!(!config.summarization_disabled());
    }

    #[test]
    fn negative_one_disables_summarization() {
        let config = Config {
            detail_length: -1,
            ..Config::default()
        };
        assert!(config.summarization_disabled());
    }

    #[test]
    fn default_server_binds_localhost() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.api_token_env.is_none());
    }

    #[test]
    fn zero_conversation_length_is_an_error() {
        let config = Config {
            conversation_length: 0,
            ..Config::default()
        };
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn default_config_has_only_warnings() {
        let config = Config::default();
        let issues = config.validate();
        assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.conversation_length, config.conversation_length);
    }
}
