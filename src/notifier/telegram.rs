use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TelegramConfig;
use crate::error::{NotifyError, Result};
use crate::notifier::Notifier;

/// Sends messages to one chat through the Telegram Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(cfg: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            endpoint: send_message_url(&cfg.api_url, &cfg.token),
            chat_id: cfg.chat_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> std::result::Result<(), NotifyError> {
        let body = SendMessage { chat_id: &self.chat_id, text };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(NotifyError::http)?;
        let status = resp.status();
        let raw = resp.text().await.map_err(NotifyError::http)?;
        check_reply(status.as_u16(), &raw)?;
        debug!(chat_id = %self.chat_id, "Telegram message delivered");
        Ok(())
    }
}

fn send_message_url(api_url: &str, token: &str) -> String {
    format!("{api_url}/bot{token}/sendMessage")
}

/// Accept only a 2xx reply whose JSON body says `"ok": true`. Error bodies
/// that are not JSON (proxy pages, empty 429s) keep their status and text.
fn check_reply(status: u16, raw: &str) -> std::result::Result<(), NotifyError> {
    let reply = serde_json::from_str::<ApiResponse>(raw).ok();
    if (200..300).contains(&status) && reply.as_ref().is_some_and(|r| r.ok) {
        return Ok(());
    }

    let description = reply
        .and_then(|r| r.description)
        .unwrap_or_else(|| {
            let text = raw.trim();
            if text.is_empty() {
                "no description".to_string()
            } else {
                text.chars().take(200).collect()
            }
        });
    Err(NotifyError::Rejected { status, description })
}
