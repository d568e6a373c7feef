use serde::{Deserialize, Serialize};

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub whatsapp: Option<WahaConfig>,
    pub telegram: Option<TelegramConfig>,
}

/// WhatsApp HTTP gateway (WAHA-style) config.
///
/// The gateway pushes inbound events to our webhook; we call its REST API
/// to send replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WahaConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Gateway base URL, e.g. `http://localhost:3000`.
    #[serde(default)]
    pub base_url: String,
    /// Gateway session name.
    #[serde(default = "default_session")]
    pub session: String,
    /// API key sent as `X-Api-Key`. Empty = no auth.
    #[serde(default)]
    pub api_key: String,
}

fn default_session() -> String {
    "default".to_string()
}

/// Telegram bot config (webhook mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
}
