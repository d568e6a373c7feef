//! Message sending through the Bot API.

use leadgate_core::config::TelegramConfig;
use leadgate_core::error::LeadgateError;

/// Client for `sendMessage`.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", config.bot_token),
        }
    }

    /// Send a text message to a chat.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), LeadgateError> {
        let url = format!("{}/sendMessage", self.base_url);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadgateError::Channel(format!("telegram send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(LeadgateError::Channel(format!(
                "telegram send failed ({status}): {error_text}"
            )));
        }

        Ok(())
    }
}
