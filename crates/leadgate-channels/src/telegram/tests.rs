//! Tests for the Telegram webhook adapter.

use super::types::*;
use super::*;

fn update(json: &str) -> TgUpdate {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_private_text_update_accepted() {
    let upd = update(
        r#"{
            "update_id": 100,
            "message": {
                "message_id": 7,
                "from": {"id": 42, "is_bot": false, "first_name": "Budi"},
                "chat": {"id": 42, "type": "private"},
                "date": 1722556800,
                "text": "Halo"
            }
        }"#,
    );
    let msg = parse_update(&upd).unwrap();
    assert_eq!(msg.user_id, "42");
    assert_eq!(msg.message_id, "42:7");
    assert_eq!(msg.text, "Halo");
    assert_eq!(msg.metadata.push_name.as_deref(), Some("Budi"));
    assert!(msg.validate().is_ok());
}

#[test]
fn test_username_preferred_for_push_name() {
    let upd = update(
        r#"{
            "update_id": 101,
            "message": {
                "message_id": 8,
                "from": {"id": 42, "is_bot": false, "first_name": "Budi", "last_name": "S", "username": "budi_s"},
                "chat": {"id": 42, "type": "private"},
                "date": 0,
                "text": "hi"
            }
        }"#,
    );
    let msg = parse_update(&upd).unwrap();
    assert_eq!(msg.metadata.push_name.as_deref(), Some("@budi_s"));
}

#[test]
fn test_bot_author_rejected() {
    let upd = update(
        r#"{
            "update_id": 102,
            "message": {
                "message_id": 9,
                "from": {"id": 99, "is_bot": true, "first_name": "SomeBot"},
                "chat": {"id": 42, "type": "private"},
                "date": 0,
                "text": "beep"
            }
        }"#,
    );
    assert!(parse_update(&upd).is_none());
}

#[test]
fn test_group_chat_rejected() {
    let upd = update(
        r#"{
            "update_id": 103,
            "message": {
                "message_id": 10,
                "from": {"id": 42, "is_bot": false, "first_name": "Budi"},
                "chat": {"id": -100123, "type": "supergroup"},
                "date": 0,
                "text": "hello all"
            }
        }"#,
    );
    assert!(parse_update(&upd).is_none());
}

#[test]
fn test_non_text_update_rejected() {
    let upd = update(
        r#"{
            "update_id": 104,
            "message": {
                "message_id": 11,
                "from": {"id": 42, "is_bot": false, "first_name": "Budi"},
                "chat": {"id": 42, "type": "private"},
                "date": 0
            }
        }"#,
    );
    assert!(parse_update(&upd).is_none());

    let upd = update(r#"{"update_id": 105}"#);
    assert!(parse_update(&upd).is_none());
}
