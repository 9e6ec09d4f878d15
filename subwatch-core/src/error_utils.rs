use crate::error::*;
use tracing::{debug, error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    /// Emits exactly one ERROR event; variant details go to DEBUG.
    fn log_error(&self) -> &Self {
        error!("[{}] {}", self.error_code(), self);
        self.log_details();
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("[{}] {}", self.error_code(), self);
        self.log_details();
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Notification(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Keywords(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::StreamExhausted { source_name } => {
                format!("The post stream from {} ended unexpectedly.", source_name)
            }
            CoreError::Internal { .. } => "An unexpected error occurred.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        let code = match self {
            CoreError::RedditApi(e) => e.error_code(),
            CoreError::Notification(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Keywords(e) => e.error_code(),
            CoreError::Network(_) => "NETWORK",
            CoreError::StreamExhausted { .. } => "STREAM_EXHAUSTED",
            CoreError::Internal { .. } => "INTERNAL",
        };
        code.to_string()
    }
}

impl CoreError {
    fn log_details(&self) {
        match self {
            CoreError::RedditApi(e) => debug!("Reddit API error details: {:?}", e),
            CoreError::Notification(e) => debug!("Notification error details: {:?}", e),
            CoreError::Config(e) => debug!("Configuration error details: {:?}", e),
            CoreError::Keywords(e) => debug!("Keyword file error details: {:?}", e),
            CoreError::Network(e) => debug!("Network error details: {:?}", e),
            _ => {}
        }
    }
}

impl RedditApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED",
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT",
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN",
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND",
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN",
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT",
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE",
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => {
                "Reddit authentication failed. Please check your credentials.".to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests to Reddit. Reddit asked to wait {} seconds.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => format!(
                "Access denied to {}. The subreddit may be private or quarantined.",
                resource
            ),
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit '{}' not found or is private.", subreddit)
            }
            RedditApiError::InvalidToken => {
                "Reddit authentication token is invalid. A new one will be requested.".to_string()
            }
            RedditApiError::RequestTimeout => "Request to Reddit timed out.".to_string(),
            RedditApiError::InvalidResponse { .. } | RedditApiError::ServerError { .. } => {
                "Reddit API error occurred.".to_string()
            }
        }
    }
}

impl NotificationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            NotificationError::AuthenticationFailed { .. } => "EMAIL_AUTH_FAILED",
            NotificationError::RateLimitExceeded { .. } => "EMAIL_RATE_LIMIT",
            NotificationError::Rejected { .. } => "EMAIL_REJECTED",
            NotificationError::DeliveryFailed { .. } => "EMAIL_DELIVERY_FAILED",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            NotificationError::AuthenticationFailed { .. } => {
                "Email provider rejected the API key. Please check SENDGRID_API_KEY.".to_string()
            }
            NotificationError::RateLimitExceeded { .. } => {
                "Email provider rate limit reached. The alert was dropped.".to_string()
            }
            NotificationError::Rejected { status_code, .. } => {
                format!("Email provider rejected the message (HTTP {}).", status_code)
            }
            NotificationError::DeliveryFailed { .. } => {
                "Email could not be delivered. The alert was dropped.".to_string()
            }
        }
    }
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR",
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file could not be parsed. Please check its TOML syntax.".to_string()
            }
        }
    }
}

impl KeywordError {
    pub fn error_code(&self) -> &'static str {
        match self {
            KeywordError::Unavailable { .. } => "KEYWORDS_UNAVAILABLE",
            KeywordError::Unreadable { .. } => "KEYWORDS_UNREADABLE",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            KeywordError::Unavailable { path, .. } => format!(
                "Keyword file '{}' is missing. The previous keywords stay active.",
                path
            ),
            KeywordError::Unreadable { path, .. } => format!(
                "Keyword file '{}' could not be read. The previous keywords stay active.",
                path
            ),
        }
    }
}

/// Reports stream failures before the monitor pauses and reopens.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        if let CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after }) = error {
            warn!(
                "Reddit asked to back off for {} seconds; the fixed retry delay still applies",
                retry_after
            );
        }
        info!("User message: {}", error.user_friendly_message());
    }
}
