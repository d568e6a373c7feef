use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which external transport a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    WhatsApp,
    Telegram,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Telegram => "telegram",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized inbound message, produced by a transport adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub transport: Transport,
    /// Transport-assigned message id, used for deduplication.
    pub message_id: String,
    /// Normalized canonical user identifier (e.g. `628xx@s.whatsapp.net`).
    pub user_id: String,
    pub text: String,
    /// True when the message was sent by our own account.
    pub from_me: bool,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_broadcast: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MessageMeta,
}

/// Secondary identifiers the transport may expose alongside `user_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMeta {
    /// Linked-device identifier (`...@lid`) when the transport exposes one.
    #[serde(default)]
    pub alt_id: Option<String>,
    /// Phone-style identifier, when extractable.
    #[serde(default)]
    pub phone: Option<String>,
    /// Display name last observed for the sender.
    #[serde(default)]
    pub push_name: Option<String>,
}

/// Why an inbound message was rejected before processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingMessageId,
    MissingUserId,
    FromSelf,
    GroupChat,
    Broadcast,
    EmptyText,
}

impl RejectReason {
    /// Short tag surfaced in the webhook response body.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingMessageId => "missing_message_id",
            Self::MissingUserId => "missing_user_id",
            Self::FromSelf => "from_self",
            Self::GroupChat => "group_ignored",
            Self::Broadcast => "broadcast_ignored",
            Self::EmptyText => "empty_text",
        }
    }
}

impl InboundMessage {
    /// Check that a message is processable by the handler pipeline.
    ///
    /// `from_me` messages are rejected here even though the pipeline has a
    /// dedicated branch for them; the webhook adapter routes those before
    /// calling validate.
    pub fn validate(&self) -> Result<(), RejectReason> {
        if self.message_id.trim().is_empty() {
            return Err(RejectReason::MissingMessageId);
        }
        if self.user_id.trim().is_empty() {
            return Err(RejectReason::MissingUserId);
        }
        if self.from_me {
            return Err(RejectReason::FromSelf);
        }
        if self.is_group {
            return Err(RejectReason::GroupChat);
        }
        if self.is_broadcast {
            return Err(RejectReason::Broadcast);
        }
        if self.text.trim().is_empty() {
            return Err(RejectReason::EmptyText);
        }
        Ok(())
    }
}

/// What the handler pipeline hands back to the transport adapter.
///
/// The adapter owns delivery: it sends `reply_text` if present, then
/// `secondary_text` after a short settle delay.
#[derive(Debug, Clone, Default)]
pub struct HandlerReply {
    pub success: bool,
    pub should_reply: bool,
    pub reply_text: Option<String>,
    pub secondary_text: Option<String>,
}

impl HandlerReply {
    /// Processed successfully, nothing to send.
    pub fn silent() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Processed successfully with a single reply.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            success: true,
            should_reply: true,
            reply_text: Some(text.into()),
            secondary_text: None,
        }
    }

    /// Processed successfully with a primary and a follow-up message.
    pub fn reply_with_secondary(text: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            success: true,
            should_reply: true,
            reply_text: Some(text.into()),
            secondary_text: Some(secondary.into()),
        }
    }

    /// Processing failed; the webhook still answers 200.
    pub fn failed() -> Self {
        Self {
            success: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> InboundMessage {
        InboundMessage {
            transport: Transport::WhatsApp,
            message_id: "m1".into(),
            user_id: "628123456789@s.whatsapp.net".into(),
            text: "Halo".into(),
            from_me: false,
            is_group: false,
            is_broadcast: false,
            timestamp: Utc::now(),
            metadata: MessageMeta::default(),
        }
    }

    #[test]
    fn test_validate_accepts_normal_message() {
        assert!(msg().validate().is_ok());
    }

    #[test]
    fn test_validate_rejections() {
        let mut m = msg();
        m.message_id = " ".into();
        assert_eq!(m.validate(), Err(RejectReason::MissingMessageId));

        let mut m = msg();
        m.user_id = "".into();
        assert_eq!(m.validate(), Err(RejectReason::MissingUserId));

        let mut m = msg();
        m.from_me = true;
        assert_eq!(m.validate(), Err(RejectReason::FromSelf));

        let mut m = msg();
        m.is_group = true;
        assert_eq!(m.validate(), Err(RejectReason::GroupChat));

        let mut m = msg();
        m.is_broadcast = true;
        assert_eq!(m.validate(), Err(RejectReason::Broadcast));

        let mut m = msg();
        m.text = "\n".into();
        assert_eq!(m.validate(), Err(RejectReason::EmptyText));
    }
}
