use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Notifier;
use crate::error::{AppError, Result};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

/// Delivers notifications through the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    token: String,
}

impl TelegramNotifier {
    pub fn new(token: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, token }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, owner_id: i64, text: &str) -> Result<()> {
        let url = format!("{TELEGRAM_API_URL}/bot{}/sendMessage", self.token);

        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: owner_id,
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "sendMessage returned HTTP {}",
                response.status()
            )));
        }

        let body: SendMessageResponse = response.json().await?;
        if !body.ok {
            return Err(AppError::Notification(
                body.description
                    .unwrap_or_else(|| "unknown delivery error".to_string()),
            ));
        }

        Ok(())
    }
}
