//! Telegram transport in webhook mode.
//!
//! Only private text chats are accepted: bot-author messages, groups,
//! channels, and non-text updates are dropped at the adapter.

pub mod send;
pub mod types;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use leadgate_core::message::{InboundMessage, MessageMeta, Transport};
use tracing::debug;
use types::TgUpdate;

/// Normalize a webhook update into an `InboundMessage`.
///
/// Returns `None` for updates the bot transport does not accept.
pub fn parse_update(update: &TgUpdate) -> Option<InboundMessage> {
    let msg = update.message.as_ref()?;
    let text = msg.text.as_ref()?;
    let user = msg.from.as_ref()?;

    if user.is_bot {
        debug!("telegram: dropping bot-author update {}", update.update_id);
        return None;
    }
    if msg.chat.chat_type != "private" {
        debug!(
            "telegram: dropping non-private chat {} ({})",
            msg.chat.id, msg.chat.chat_type
        );
        return None;
    }

    let push_name = if let Some(ref un) = user.username {
        format!("@{un}")
    } else if let Some(ref ln) = user.last_name {
        format!("{} {ln}", user.first_name)
    } else {
        user.first_name.clone()
    };

    Some(InboundMessage {
        transport: Transport::Telegram,
        message_id: format!("{}:{}", msg.chat.id, msg.message_id),
        user_id: user.id.to_string(),
        text: text.clone(),
        from_me: false,
        is_group: false,
        is_broadcast: false,
        timestamp: DateTime::<Utc>::from_timestamp(msg.date, 0).unwrap_or_else(Utc::now),
        metadata: MessageMeta {
            alt_id: None,
            phone: None,
            push_name: Some(push_name),
        },
    })
}
