//! Runtime configuration for the chat service.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Primary environment variable holding the completion API credential.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
/// Lowercase spelling accepted for existing deployments.
pub const API_KEY_ENV_LEGACY: &str = "groq_api_key";

const API_URL_ENV: &str = "CALMLINE_API_URL";
const MODEL_ENV: &str = "CALMLINE_MODEL";
const MAX_INPUT_ENV: &str = "CALMLINE_MAX_INPUT_CHARS";
const PACING_ENV: &str = "CALMLINE_PACING_MS";
const INCLUDE_HISTORY_ENV: &str = "CALMLINE_INCLUDE_HISTORY";
const PORT_ENV: &str = "CALMLINE_PORT";
const CHAT_LOG_ENV: &str = "CALMLINE_CHAT_LOG";
const ERROR_LOG_ENV: &str = "CALMLINE_ERROR_LOG";
const STATIC_DIR_ENV: &str = "CALMLINE_STATIC_DIR";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/";
/// Default completion model.
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
/// Preamble sent ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
/// Default maximum input length, in characters.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 1000;
/// Default delay between published snapshots.
pub const DEFAULT_PACING: Duration = Duration::from_millis(50);
/// Default listening port.
pub const DEFAULT_PORT: u16 = 10_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The completion API credential is absent.
    #[error("completion API key not found: set GROQ_API_KEY")]
    MissingApiKey,
    /// A value could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },
    /// A configured URL is malformed.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// An invariant does not hold.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration shared by the controller, the completion client and the server.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Credential for the completion API.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API.
    pub api_base_url: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// System preamble prepended to every request.
    pub system_prompt: String,
    /// Maximum accepted input length, in characters.
    pub max_input_chars: usize,
    /// Delay between published snapshots while streaming.
    #[serde(with = "duration_ms")]
    pub pacing: Duration,
    /// Send prior turns along with the current message.
    pub include_history: bool,
    /// Listening port.
    pub port: u16,
    /// Conversation log file.
    pub chat_log_path: PathBuf,
    /// Error log file.
    pub error_log_path: PathBuf,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
    /// Overall HTTP timeout for a completion call.
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    /// HTTP connect timeout.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("max_input_chars", &self.max_input_chars)
            .field("pacing", &self.pacing)
            .field("include_history", &self.include_history)
            .field("port", &self.port)
            .field("chat_log_path", &self.chat_log_path)
            .field("error_log_path", &self.error_log_path)
            .finish_non_exhaustive()
    }
}

impl ChatConfig {
    /// Create a config with defaults and the given credential.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            pacing: DEFAULT_PACING,
            include_history: false,
            port: DEFAULT_PORT,
            chat_log_path: PathBuf::from("chat_log.txt"),
            error_log_path: PathBuf::from("error_log.txt"),
            static_dir: PathBuf::from("static"),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if the API key is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error if the API key is missing or a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .or_else(|| lookup(API_KEY_ENV_LEGACY))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Some(url) = lookup(API_URL_ENV) {
            config.api_base_url = url;
        }
        if let Some(model) = lookup(MODEL_ENV) {
            config.model = model;
        }
        if let Some(raw) = lookup(MAX_INPUT_ENV) {
            config.max_input_chars = parse_value(MAX_INPUT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(PACING_ENV) {
            config.pacing = Duration::from_millis(parse_value(PACING_ENV, &raw)?);
        }
        if let Some(raw) = lookup(INCLUDE_HISTORY_ENV) {
            config.include_history = parse_value(INCLUDE_HISTORY_ENV, &raw)?;
        }
        if let Some(raw) = lookup(PORT_ENV) {
            config.port = parse_value(PORT_ENV, &raw)?;
        }
        if let Some(path) = lookup(CHAT_LOG_ENV) {
            config.chat_log_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ERROR_LOG_ENV) {
            config.error_log_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(STATIC_DIR_ENV) {
            config.static_dir = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any value is out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.max_input_chars == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_input_chars must be > 0".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "model must not be empty".to_string(),
            ));
        }
        self.completions_url()?;
        Ok(())
    }

    /// Full URL of the chat completions endpoint.
    ///
    /// # Errors
    /// Returns an error if the base URL is malformed.
    pub fn completions_url(&self) -> Result<Url, ConfigError> {
        let mut base = Url::parse(&self.api_base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join("chat/completions")?)
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the pacing delay.
    #[must_use]
    pub const fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the maximum input length.
    #[must_use]
    pub const fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    /// Enable or disable sending prior turns.
    #[must_use]
    pub const fn with_history(mut self, include: bool) -> Self {
        self.include_history = include;
        self
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

/// Serde module for millisecond durations.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
