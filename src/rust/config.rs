use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::model_manager::{ModelManager, ModelSource};

/// Default upload cap for `/api/predict`.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5500";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} is required when {because} is set")]
    Missing { key: &'static str, because: &'static str },
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// External classifier process invocation: `program [args..] <image path>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

/// Chat completion deployment used for sign descriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl ChatConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            deployment: "gpt-4o-mini".to_string(),
            api_version: "2024-12-01-preview".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Settings of the relay server.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: SocketAddr,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    /// Directory for request-scoped upload files
    pub upload_dir: PathBuf,
    /// When unset, predictions run on the in-process heuristic classifier
    pub classifier: Option<ProcessConfig>,
    pub models_dir: PathBuf,
    pub model: Option<ModelSource>,
    pub chat: Option<ChatConfig>,
    /// Serve a template description when the chat backend fails
    pub local_description_fallback: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5500)),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_dir: env::temp_dir(),
            classifier: None,
            models_dir: ModelManager::get_default_models_dir(),
            model: None,
            chat: None,
            local_description_fallback: false,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from `SIGNSCAN_*` environment variables.
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Unset keys keep
    /// their defaults; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(bind) = get("SIGNSCAN_BIND") {
            config.bind_addr = parse_value("SIGNSCAN_BIND", &bind)?;
        }
        if let Some(origins) = get("SIGNSCAN_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(limit) = get("SIGNSCAN_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_value("SIGNSCAN_MAX_UPLOAD_BYTES", &limit)?;
        }
        if let Some(dir) = get("SIGNSCAN_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(program) = get("SIGNSCAN_CLASSIFIER") {
            let args = get("SIGNSCAN_CLASSIFIER_ARGS")
                .map(|a| a.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            let timeout = match get("SIGNSCAN_CLASSIFIER_TIMEOUT_SECS") {
                Some(secs) => parse_timeout("SIGNSCAN_CLASSIFIER_TIMEOUT_SECS", &secs)?,
                None => DEFAULT_CLASSIFIER_TIMEOUT,
            };
            config.classifier = Some(ProcessConfig { program, args, timeout });
        }

        if let Some(cache) = get("SIGNSCAN_CACHE") {
            config.models_dir = PathBuf::from(cache).join("models");
        }
        if let Some(name) = get("SIGNSCAN_MODEL_NAME") {
            config.model = Some(ModelSource {
                name,
                url: get("SIGNSCAN_MODEL_URL"),
                sha256: get("SIGNSCAN_MODEL_SHA256").map(|h| h.to_lowercase()),
            });
        }

        if let Some(endpoint) = get("SIGNSCAN_CHAT_ENDPOINT") {
            let api_key = get("SIGNSCAN_CHAT_API_KEY").ok_or(ConfigError::Missing {
                key: "SIGNSCAN_CHAT_API_KEY",
                because: "SIGNSCAN_CHAT_ENDPOINT",
            })?;
            let mut chat = ChatConfig::new(endpoint, api_key);
            if let Some(deployment) = get("SIGNSCAN_CHAT_DEPLOYMENT") {
                chat.deployment = deployment;
            }
            if let Some(version) = get("SIGNSCAN_CHAT_API_VERSION") {
                chat.api_version = version;
            }
            config.chat = Some(chat);
        }

        if let Some(flag) = get("SIGNSCAN_LOCAL_DESCRIPTION_FALLBACK") {
            config.local_description_fallback = parse_flag("SIGNSCAN_LOCAL_DESCRIPTION_FALLBACK", &flag)?;
        }

        Ok(config)
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })
}

fn parse_timeout(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_value(key, raw)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            message: "timeout must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got {:?}", other),
        }),
    }
}
