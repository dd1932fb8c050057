use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use teloxide::types::{ChatId, Recipient};
use tracing::{error, info};

use crate::error::PollError;

pub const PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";
pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const HOMEWORK_NAME: &str = "HOMEWORK_NAME";

pub const DEFAULT_SETTINGS_PATH: &str = "notifier.toml";

/// Non-secret settings, read from an optional TOML file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Substring of the tracked submission's `homework_name`
    #[serde(default)]
    pub homework_name: String,
    #[serde(default = "default_retry_period_secs")]
    pub retry_period_secs: u64,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,
}

fn default_endpoint() -> String {
    "https://practicum.yandex.ru/api/user_api/homework_statuses/".to_string()
}

fn default_retry_period_secs() -> u64 {
    600
}

fn default_lookback_days() -> u32 {
    20
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_fetch_attempts() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            homework_name: String::new(),
            retry_period_secs: default_retry_period_secs(),
            lookback_days: default_lookback_days(),
            request_timeout_secs: default_request_timeout_secs(),
            fetch_attempts: default_fetch_attempts(),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file falls back to defaults unless
    /// `required` is set. `HOMEWORK_NAME` from the environment wins over the file.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let settings = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))?
        } else if required {
            anyhow::bail!("Settings file not found: {}", path.display());
        } else {
            info!("No settings file at {}, using defaults", path.display());
            Self::default()
        };

        Ok(settings.with_homework_name(std::env::var(HOMEWORK_NAME).ok()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid settings TOML")
    }

    fn with_homework_name(mut self, name: Option<String>) -> Self {
        if let Some(name) = name {
            self.homework_name = name;
        }
        self
    }

    pub fn retry_period(&self) -> Duration {
        Duration::from_secs(self.retry_period_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Attempts per cycle, never less than one.
    pub fn fetch_attempts(&self) -> u32 {
        self.fetch_attempts.max(1)
    }
}

/// Secrets as found in the environment, before validation.
#[derive(Default, Clone)]
pub struct RawSecrets {
    pub practicum_token: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl RawSecrets {
    pub fn from_env() -> Self {
        Self {
            practicum_token: std::env::var(PRACTICUM_TOKEN).ok(),
            telegram_token: std::env::var(TELEGRAM_TOKEN).ok(),
            telegram_chat_id: std::env::var(TELEGRAM_CHAT_ID).ok(),
        }
    }

    /// Names of the variables that are unset or blank.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (PRACTICUM_TOKEN, &self.practicum_token),
            (TELEGRAM_TOKEN, &self.telegram_token),
            (TELEGRAM_CHAT_ID, &self.telegram_chat_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }
}

/// Log every missing secret; true only when all three are present.
pub fn check_tokens(secrets: &RawSecrets) -> bool {
    let missing = secrets.missing();
    for name in &missing {
        error!("Missing required environment variable: {}", name);
    }
    if missing.is_empty() {
        info!("All required tokens are present");
    }
    missing.is_empty()
}

/// Validated secrets.
#[derive(Clone)]
pub struct Credentials {
    pub practicum_token: String,
    pub telegram_token: String,
    pub chat: Recipient,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("chat", &self.chat)
            .finish()
    }
}

impl TryFrom<RawSecrets> for Credentials {
    type Error = PollError;

    fn try_from(secrets: RawSecrets) -> Result<Self, Self::Error> {
        let require = |value: Option<String>, name: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PollError::Config(format!("{name} is not set")))
        };

        let practicum_token = require(secrets.practicum_token, PRACTICUM_TOKEN)?;
        let telegram_token = require(secrets.telegram_token, TELEGRAM_TOKEN)?;
        let chat = parse_chat(&require(secrets.telegram_chat_id, TELEGRAM_CHAT_ID)?)?;

        Ok(Self {
            practicum_token,
            telegram_token,
            chat,
        })
    }
}

/// Numeric chat ids and `@channel` usernames are both accepted by the Bot API.
fn parse_chat(value: &str) -> Result<Recipient, PollError> {
    if let Ok(id) = value.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if value.len() > 1 && value.starts_with('@') {
        return Ok(Recipient::ChannelUsername(value.to_string()));
    }
    Err(PollError::Config(format!(
        "{TELEGRAM_CHAT_ID} must be a numeric id or an @username, got \"{value}\""
    )))
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub settings: Settings,
}

impl Config {
    pub fn new(secrets: RawSecrets, settings: Settings) -> Result<Self, PollError> {
        Ok(Self {
            credentials: Credentials::try_from(secrets)?,
            settings,
        })
    }
}
