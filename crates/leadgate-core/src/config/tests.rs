use super::*;

#[test]
fn test_defaults_match_documented_values() {
    let cfg = Config::default();
    assert_eq!(cfg.kv.lock_ttl_seconds, 10);
    assert_eq!(cfg.kv.user_cooldown_seconds, 2);
    assert_eq!(cfg.kv.idempotency_ttl_seconds, 86_400);
    assert_eq!(cfg.kv.mark_processed, MarkMode::Early);
    assert_eq!(cfg.handler.max_warnings, 3);
    assert_eq!(cfg.handler.lock_max_attempts, 3);
    assert_eq!(cfg.jobs.spreadsheet_sync_max_attempts, 5);
    assert_eq!(cfg.jobs.operator_notify_max_attempts, 3);
}

#[test]
fn test_partial_toml_fills_defaults() {
    let toml_str = r#"
        [kv]
        lock_ttl_seconds = 30

        [handler]
        max_warnings = 5
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.kv.lock_ttl_seconds, 30);
    assert_eq!(cfg.kv.user_cooldown_seconds, 2);
    assert_eq!(cfg.handler.max_warnings, 5);
    assert_eq!(cfg.jobs.spreadsheet_sync_max_attempts, 5);
}

#[test]
fn test_mark_mode_kebab_case() {
    let toml_str = r#"
        [kv]
        mark_processed = "post-commit"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.kv.mark_processed, MarkMode::PostCommit);
}

#[test]
fn test_channel_config_from_toml() {
    let toml_str = r#"
        [channel.whatsapp]
        enabled = true
        base_url = "http://localhost:3000"
        api_key = "secret"

        [channel.telegram]
        enabled = true
        bot_token = "123:abc"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    let wa = cfg.channel.whatsapp.unwrap();
    assert!(wa.enabled);
    assert_eq!(wa.session, "default");
    assert_eq!(cfg.channel.telegram.unwrap().bot_token, "123:abc");
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/leadgate-config.toml").unwrap();
    assert_eq!(cfg.server.port, 8088);
}
