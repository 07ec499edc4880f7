use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::notify::Notifier;

const API_URL: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Sends Markdown messages through the Telegram Bot API. Without both a
/// token and a chat id every send is a silent no-op.
pub struct TelegramNotifier {
    client: Client,
    credentials: Option<(String, String)>,
}

impl TelegramNotifier {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let credentials = match (&cfg.tg_bot_token, &cfg.tg_chat_id) {
            (Some(token), Some(chat)) => Some((token.clone(), chat.clone())),
            _ => None,
        };
        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let Some((token, chat_id)) = &self.credentials else {
            return Ok(());
        };

        let resp = self
            .client
            .post(format!("{}/bot{}/sendMessage", API_URL, token))
            .json(&SendMessage {
                chat_id,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await
            .context("Telegram request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error {}: {}", status, body);
        }
        Ok(())
    }
}
