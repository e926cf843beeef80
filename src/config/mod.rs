//! Configuration module - environment variable parsing

use std::env;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Production flag; the notification relay stays silent unless set
    pub is_production: bool,

    /// Telegram bot API token for the notification relay
    pub telegram_bot_token: Option<String>,
    /// Telegram channel the relay posts to
    pub telegram_chat_id: Option<String>,

    /// Public base URL used in lobby deep links
    pub app_base_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            is_production: env::var("IS_PRODUCTION")
                .map(|v| v == "true")
                .unwrap_or(false),

            telegram_bot_token: env::var("TELEGRAM_BOT_API_KEY").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHANNEL_ID").ok(),

            app_base_url: env::var("APP_BASE_URL").unwrap_or_default(),
        }
    }
}
