//! Configuration system (layered: code > env > config file > defaults).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StepStreamError};

/// Global default config (lazy-initialized from env).
static DEFAULT_CONFIG: OnceLock<OrchestratorConfig> = OnceLock::new();

pub const DEFAULT_TOOL_CALL_LIMIT: usize = 5;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

const TOOL_CALL_LIMIT_ENV: &str = "STEPSTREAM_TOOL_CALL_LIMIT";
const IDLE_TIMEOUT_MS_ENV: &str = "STEPSTREAM_IDLE_TIMEOUT_MS";
const CONFIG_PATH_ENV: &str = "STEPSTREAM_CONFIG";

const DEFAULT_MODEL: &str = "gpt-4o";
const DEEPSEEK_MODEL: &str = "deepseek-chat";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MODEL_ENV: &str = "OPENAI_MODEL";
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Per-run bounds applied by the orchestrator.
///
/// Resolution order:
/// 1. Values set in code (builder or field assignment)
/// 2. `STEPSTREAM_TOOL_CALL_LIMIT` / `STEPSTREAM_IDLE_TIMEOUT_MS`
/// 3. A TOML config file
/// 4. Defaults (5 tool calls, 10 second idle bound)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Tool calls allowed per run; the next one fails the run.
    #[builder(default = DEFAULT_TOOL_CALL_LIMIT)]
    #[serde(default = "default_tool_call_limit")]
    pub tool_call_limit: usize,
    /// How long a message may stay without steps before it is flagged unresponsive.
    #[builder(default = DEFAULT_IDLE_TIMEOUT)]
    #[serde(
        default = "default_idle_timeout",
        rename = "idle_timeout_ms",
        with = "duration_ms"
    )]
    pub idle_timeout: Duration,
}

fn default_tool_call_limit() -> usize {
    DEFAULT_TOOL_CALL_LIMIT
}

fn default_idle_timeout() -> Duration {
    DEFAULT_IDLE_TIMEOUT
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tool_call_limit: DEFAULT_TOOL_CALL_LIMIT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().with_env_overrides()
    }

    /// Get (or create) the global default config.
    ///
    /// Reads the file named by `STEPSTREAM_CONFIG` (or the per-user default
    /// location) when present; unreadable files fall back to defaults.
    pub fn global() -> &'static OrchestratorConfig {
        DEFAULT_CONFIG.get_or_init(|| {
            let _ = dotenvy::dotenv();
            let path = std::env::var(CONFIG_PATH_ENV)
                .ok()
                .map(PathBuf::from)
                .or_else(default_config_path);
            let config = match path {
                Some(path) if path.exists() => Self::load_file(&path).unwrap_or_else(|err| {
                    tracing::warn!(path = %path.display(), error = %err, "ignoring config file");
                    Self::default()
                }),
                _ => Self::default(),
            };
            config.with_env_overrides()
        })
    }

    /// Load a TOML config file. Missing keys take their defaults.
    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|err| StepStreamError::Configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. Zero or unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(limit) = env_positive(TOOL_CALL_LIMIT_ENV) {
            self.tool_call_limit = limit;
        }
        if let Some(ms) = env_positive(IDLE_TIMEOUT_MS_ENV) {
            self.idle_timeout = Duration::from_millis(ms as u64);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tool_call_limit == 0 {
            return Err(StepStreamError::Configuration(
                "tool_call_limit must be at least 1".to_string(),
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(StepStreamError::Configuration(
                "idle_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-user config file location (`<config dir>/stepstream/config.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "stepstream")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn env_positive(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|value| parse_positive_usize(&value))
}

fn parse_positive_usize(value: &str) -> Option<usize> {
    let parsed = value.trim().parse::<usize>().ok()?;
    if parsed == 0 {
        None
    } else {
        Some(parsed)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Assistant endpoint settings with the host's fallback rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantSettings {
    pub model: String,
    pub base_url: String,
}

impl AssistantSettings {
    /// Resolve settings from optional host preferences.
    ///
    /// Blank values count as unset. Without an explicit model, a DeepSeek
    /// base URL selects `deepseek-chat`; otherwise `gpt-4o`.
    pub fn resolve(model: Option<&str>, base_url: Option<&str>) -> Self {
        let base_url = non_blank(base_url);
        let model = match non_blank(model) {
            Some(model) => model.to_string(),
            None if base_url.map(is_deepseek).unwrap_or(false) => DEEPSEEK_MODEL.to_string(),
            None => DEFAULT_MODEL.to_string(),
        };
        Self {
            model,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
        }
    }

    /// Load from environment variables (`OPENAI_MODEL`, `OPENAI_BASE_URL`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let model = std::env::var(MODEL_ENV).ok();
        let base_url = std::env::var(BASE_URL_ENV).ok();
        Self::resolve(model.as_deref(), base_url.as_deref())
    }

    /// Friendly provider name derived from the base URL.
    pub fn provider_name(&self) -> &'static str {
        if is_deepseek(&self.base_url) {
            "DeepSeek"
        } else {
            "OpenAI"
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn is_deepseek(base_url: &str) -> bool {
    base_url.to_lowercase().contains("deepseek")
}
