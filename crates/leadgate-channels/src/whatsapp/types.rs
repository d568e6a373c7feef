//! WAHA-style gateway webhook deserialization types.

use serde::Deserialize;

/// Top-level webhook envelope.
#[derive(Debug, Deserialize)]
pub struct WahaWebhook {
    /// Event name: "message", "message.any", or something we ignore.
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub session: String,
    pub payload: Option<WahaPayload>,
}

impl WahaWebhook {
    /// Whether this event carries a chat message at all.
    pub fn is_message_event(&self) -> bool {
        matches!(self.event.as_str(), "message" | "message.any")
    }
}

/// Message payload, the subset of fields the core consumes.
#[derive(Debug, Deserialize)]
pub struct WahaPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default, rename = "fromMe")]
    pub from_me: bool,
    #[serde(default, rename = "isGroup")]
    pub is_group: Option<bool>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, rename = "chatId")]
    pub chat_id: Option<String>,
    /// Present on group messages: the member who sent it.
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(default, rename = "_data")]
    pub data: Option<WahaData>,
}

/// Raw client data nested under `_data`.
#[derive(Debug, Default, Deserialize)]
pub struct WahaData {
    #[serde(default)]
    pub key: Option<WahaKey>,
    #[serde(default, rename = "pushName")]
    pub push_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WahaKey {
    #[serde(default, rename = "remoteJid")]
    pub remote_jid: Option<String>,
    #[serde(default, rename = "remoteJidAlt")]
    pub remote_jid_alt: Option<String>,
    #[serde(default, rename = "fromMe")]
    pub from_me: Option<bool>,
}
