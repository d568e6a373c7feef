//! Outbound messages through the WAHA gateway REST API.

use leadgate_core::config::WahaConfig;
use leadgate_core::error::LeadgateError;

/// Client for the gateway's send endpoints.
#[derive(Clone)]
pub struct WahaClient {
    config: WahaConfig,
    client: reqwest::Client,
}

impl WahaClient {
    pub fn new(config: WahaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Send a text message to a chat.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), LeadgateError> {
        let url = format!("{}/api/sendText", self.config.base_url);
        let body = serde_json::json!({
            "session": self.config.session,
            "chatId": chat_id,
            "text": text,
        });

        let mut req = self.client.post(&url).json(&body);
        if !self.config.api_key.is_empty() {
            req = req.header("X-Api-Key", &self.config.api_key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| LeadgateError::Channel(format!("waha send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(LeadgateError::Channel(format!(
                "waha send failed ({status}): {error_text}"
            )));
        }

        Ok(())
    }
}
