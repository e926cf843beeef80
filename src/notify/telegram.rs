//! Telegram relay: fire-and-forget posts, errors logged and swallowed

use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;

use super::Notifier;

#[derive(Clone)]
struct Credentials {
    token: String,
    chat_id: String,
}

/// Telegram-backed notifier.
/// Disabled outside production or when credentials are missing; every send
/// failure is logged and otherwise ignored.
pub struct TelegramNotifier {
    client: Client,
    credentials: Option<Credentials>,
}

impl TelegramNotifier {
    pub fn from_config(config: &Config) -> Self {
        let credentials = match (
            config.is_production,
            &config.telegram_bot_token,
            &config.telegram_chat_id,
        ) {
            (true, Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(Credentials {
                    token: token.clone(),
                    chat_id: chat_id.clone(),
                })
            }
            _ => None,
        };
        if credentials.is_none() {
            debug!("telegram relay disabled");
        }
        Self {
            client: Client::new(),
            credentials,
        }
    }

    pub fn enabled(&self) -> bool {
        self.credentials.is_some()
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, text: &str) {
        let Some(credentials) = self.credentials.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime available, dropping notification");
            return;
        };

        let client = self.client.clone();
        let text = text.to_string();
        handle.spawn(async move {
            let url = format!(
                "https://api.telegram.org/bot{}/sendMessage",
                credentials.token
            );
            let payload = json!({
                "chat_id": credentials.chat_id,
                "text": text,
            });
            match client.post(&url).json(&payload).send().await {
                Ok(response) => {
                    info!(status = %response.status(), "telegram notification sent")
                }
                Err(err) => warn!(error = %err, "telegram notification failed"),
            }
        });
    }
}
