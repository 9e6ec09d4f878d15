use crate::error::ConfigError;
use crate::seen_cache::DEFAULT_SEEN_CAPACITY;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Names an optional TOML file with [`MonitorSettings`].
pub const CONFIG_PATH_VAR: &str = "SUBWATCH_CONFIG";

const SUBREDDITS_VAR: &str = "SUBWATCH_SUBREDDITS";
const KEYWORDS_FILE_VAR: &str = "SUBWATCH_KEYWORDS_FILE";
const RETRY_DELAY_VAR: &str = "SUBWATCH_RETRY_DELAY_SECS";

const REDDIT_CLIENT_ID_VAR: &str = "REDDIT_CLIENT_ID";
const REDDIT_CLIENT_SECRET_VAR: &str = "REDDIT_CLIENT_SECRET";
const REDDIT_USER_AGENT_VAR: &str = "REDDIT_USER_AGENT";
const SENDGRID_API_KEY_VAR: &str = "SENDGRID_API_KEY";
const SENDER_EMAIL_VAR: &str = "SENDER_EMAIL";
const RECIPIENT_EMAIL_VAR: &str = "RECIPIENT_EMAIL";

/// Non-secret settings, read from the optional TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Subreddits to watch, `+`-joined as Reddit expects (`all` for everything)
    pub subreddits: String,
    /// Path of the keyword file
    pub keywords_file: PathBuf,
    /// Pause after a stream failure before reopening it (in seconds)
    pub error_retry_delay_secs: u64,
    /// Keyword file poll interval when file watching is unavailable (in seconds)
    pub keyword_poll_interval_secs: u64,
    /// Number of post identifiers remembered for deduplication
    pub seen_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            subreddits: "all".to_string(),
            keywords_file: PathBuf::from("keywords.txt"),
            error_retry_delay_secs: 60,
            keyword_poll_interval_secs: 5,
            seen_capacity: DEFAULT_SEEN_CAPACITY,
        }
    }
}

impl MonitorSettings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::ValidationFailed {
                reason: format!("cannot read {}: {}", path.display(), e),
            },
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn error_retry_delay(&self) -> Duration {
        Duration::from_secs(self.error_retry_delay_secs)
    }

    pub fn keyword_poll_interval(&self) -> Duration {
        Duration::from_secs(self.keyword_poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subreddits.trim().is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "subreddits must not be empty".to_string(),
            });
        }
        if self.error_retry_delay_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "error_retry_delay_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.keyword_poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "keyword_poll_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.seen_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "seen_capacity".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Clone)]
pub struct EmailSettings {
    pub api_key: String,
    pub sender: String,
    pub recipient: String,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("api_key", &"<redacted>")
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: MonitorSettings,
    pub reddit: RedditCredentials,
    pub email: EmailSettings,
}

impl AppConfig {
    /// Loads `.env`, the optional settings file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env file: {}", e),
        }

        let settings = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                info!("Reading settings from {}", path);
                MonitorSettings::from_file(path)?
            }
            Err(_) => MonitorSettings::default(),
        };

        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    /// Applies environment overrides and required secrets from `lookup` on top of `settings`.
    pub fn from_lookup<F>(mut settings: MonitorSettings, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(subreddits) = lookup(SUBREDDITS_VAR) {
            settings.subreddits = subreddits;
        }
        if let Some(path) = lookup(KEYWORDS_FILE_VAR) {
            settings.keywords_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup(RETRY_DELAY_VAR) {
            settings.error_retry_delay_secs =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: RETRY_DELAY_VAR.to_string(),
                        value: raw.clone(),
                    })?;
        }
        settings.validate()?;

        let required = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                    var_name: name.to_string(),
                })
        };

        Ok(Self {
            reddit: RedditCredentials {
                client_id: required(REDDIT_CLIENT_ID_VAR)?,
                client_secret: required(REDDIT_CLIENT_SECRET_VAR)?,
                user_agent: required(REDDIT_USER_AGENT_VAR)?,
            },
            email: EmailSettings {
                api_key: required(SENDGRID_API_KEY_VAR)?,
                sender: required(SENDER_EMAIL_VAR)?,
                recipient: required(RECIPIENT_EMAIL_VAR)?,
            },
            settings,
        })
    }
}
