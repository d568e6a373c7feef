//! WhatsApp transport via a WAHA-style HTTP gateway.
//!
//! The gateway pushes webhook events to us; replies go back through its
//! REST API. This module normalizes the webhook payload into an
//! `InboundMessage` and hosts the outbound client.

pub mod send;
pub mod types;


use chrono::{DateTime, Utc};
use leadgate_core::message::{InboundMessage, MessageMeta, Transport};
use types::WahaPayload;

/// Normalize a raw identifier into the canonical user id form.
///
/// `@lid` and `@s.whatsapp.net` are already canonical; the legacy `@c.us`
/// suffix maps onto `@s.whatsapp.net`; bare phone digits (10+) get the
/// canonical suffix appended. Anything else passes through untouched.
pub fn normalize_user_id(raw: &str) -> String {
    if raw.ends_with("@lid") || raw.ends_with("@s.whatsapp.net") {
        return raw.to_string();
    }
    if let Some(digits) = raw.strip_suffix("@c.us") {
        return format!("{digits}@s.whatsapp.net");
    }
    if raw.len() >= 10 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return format!("{raw}@s.whatsapp.net");
    }
    raw.to_string()
}

/// Whether a jid addresses a group chat.
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with("@g.us")
}

/// Whether a jid addresses a status/broadcast channel.
pub fn is_broadcast_jid(jid: &str) -> bool {
    jid.contains("status@broadcast") || jid.ends_with("@broadcast")
}

/// Bare phone digits from a phone-style jid, if it is one.
fn phone_digits(jid: &str) -> Option<String> {
    let digits = jid
        .strip_suffix("@s.whatsapp.net")
        .or_else(|| jid.strip_suffix("@c.us"))?;
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(digits.to_string())
    } else {
        None
    }
}

/// Normalize a webhook payload into an `InboundMessage`.
pub fn parse_payload(payload: &WahaPayload) -> InboundMessage {
    let key = payload.data.as_ref().and_then(|d| d.key.as_ref());
    let remote_jid = key.and_then(|k| k.remote_jid.as_deref());
    let remote_jid_alt = key.and_then(|k| k.remote_jid_alt.as_deref());

    let from_me = payload.from_me || key.and_then(|k| k.from_me).unwrap_or(false);

    // The chat we are talking to: chatId when the gateway provides it,
    // otherwise the raw client jid; for our own outbound messages the
    // counterparty is the recipient, not `from`.
    let raw_chat = payload
        .chat_id
        .as_deref()
        .or(remote_jid)
        .or(if from_me {
            payload.to.as_deref()
        } else {
            Some(payload.from.as_str())
        })
        .unwrap_or("");

    let is_group = is_group_jid(raw_chat)
        || payload.is_group.unwrap_or(false)
        || payload.participant.is_some();
    let is_broadcast = is_broadcast_jid(raw_chat);

    let user_id = normalize_user_id(raw_chat);

    // Both identifier shapes go into metadata when extractable: the lid from
    // whichever jid carries it, the phone from the phone-style one.
    let all_jids = [Some(raw_chat), remote_jid, remote_jid_alt, Some(payload.from.as_str())];
    let lid = all_jids
        .into_iter()
        .flatten()
        .find(|j| j.ends_with("@lid"))
        .map(str::to_string);
    let phone = all_jids.into_iter().flatten().find_map(phone_digits);

    let alt_id = remote_jid_alt
        .map(normalize_user_id)
        .filter(|alt| *alt != user_id)
        .or_else(|| lid.clone().filter(|l| *l != user_id));

    let timestamp = payload
        .timestamp
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .unwrap_or_else(Utc::now);

    InboundMessage {
        transport: Transport::WhatsApp,
        message_id: payload.id.clone(),
        user_id,
        text: payload.body.clone(),
        from_me,
        is_group,
        is_broadcast,
        timestamp,
        metadata: MessageMeta {
            alt_id,
            phone,
            push_name: payload.data.as_ref().and_then(|d| d.push_name.clone()),
        },
    }
}
