//! End-to-end pipeline tests on an in-memory store and KV backend.

use super::Gateway;
use chrono::Utc;
use leadgate_core::config::{Config, StoreConfig};
use leadgate_core::message::{InboundMessage, MessageMeta, Transport};
use leadgate_core::state::LeadState;
use leadgate_core::templates::ReplyTemplates;
use leadgate_kv::{MemoryKv, UserLock};
use leadgate_store::{Lead, QUEUE_OPERATOR_NOTIFY, QUEUE_SPREADSHEET_SYNC};
use std::sync::Arc;
use std::time::Duration;

const USER: &str = "628123456789@s.whatsapp.net";

fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.store = StoreConfig {
        db_path: ":memory:".into(),
    };
    cfg.kv.backend = "memory".into();
    // Chained scenario messages should not trip over the post-reply cooldown.
    cfg.kv.user_cooldown_seconds = 0;
    cfg
}

async fn gateway_with(cfg: &Config, kv: Arc<MemoryKv>) -> Gateway {
    let store = leadgate_store::Store::new(&cfg.store).await.unwrap();
    Gateway::new(cfg, store, kv, ReplyTemplates::default())
}

async fn test_gateway() -> Gateway {
    gateway_with(&test_config(), Arc::new(MemoryKv::new())).await
}

fn wa(id: &str, text: &str) -> InboundMessage {
    InboundMessage {
        transport: Transport::WhatsApp,
        message_id: id.into(),
        user_id: USER.into(),
        text: text.into(),
        from_me: false,
        is_group: false,
        is_broadcast: false,
        timestamp: Utc::now(),
        metadata: MessageMeta {
            alt_id: None,
            phone: Some("628123456789".into()),
            push_name: Some("Budi".into()),
        },
    }
}

async fn lead(gw: &Gateway, user: &str) -> Lead {
    let mut conn = gw.store().pool().acquire().await.unwrap();
    gw.store()
        .get_by_primary(&mut conn, user)
        .await
        .unwrap()
        .expect("lead should exist")
}

async fn interaction_count(gw: &Gateway, lead_id: &str) -> i64 {
    let mut conn = gw.store().pool().acquire().await.unwrap();
    gw.store().interaction_count(&mut conn, lead_id).await.unwrap()
}

#[tokio::test]
async fn test_fresh_greeting_creates_lead_and_welcomes() {
    let gw = test_gateway().await;
    let templates = ReplyTemplates::default();

    let reply = gw.handle_message(&wa("m1", "Halo")).await;
    assert!(reply.success);
    assert!(reply.should_reply);
    assert_eq!(reply.reply_text.as_deref(), Some(templates.welcome.as_str()));
    assert!(reply.secondary_text.is_none());

    let lead = lead(&gw, USER).await;
    assert_eq!(lead.state, LeadState::ChooseOption);
    assert_eq!(lead.push_name.as_deref(), Some("Budi"));
    assert_eq!(interaction_count(&gw, &lead.lead_id).await, 1);

    // A brand-new lead queues one operator heads-up.
    assert_eq!(
        gw.store().pending_job_count(QUEUE_OPERATOR_NOTIFY).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_full_qualification_flow() {
    let gw = test_gateway().await;
    let templates = ReplyTemplates::default();

    // Scenario 1: greeting.
    gw.handle_message(&wa("m1", "Halo")).await;

    // Scenario 2: option 1 sends the ack plus the blank form as a pair.
    let reply = gw.handle_message(&wa("m2", "1")).await;
    assert_eq!(
        reply.reply_text.as_deref(),
        Some(templates.choose_option_ack.as_str())
    );
    assert_eq!(
        reply.secondary_text.as_deref(),
        Some(templates.form_template.as_str())
    );
    assert_eq!(lead(&gw, USER).await.state, LeadState::FormSent);

    // Scenario 3: one complete form submission.
    let reply = gw
        .handle_message(&wa(
            "m3",
            "Nama, Domisili: Budi, Jakarta\nSumber info: Instagram\nJenis bisnis: F&B\nBudget: 100 juta\nRencana mulai: 3 bulan lagi",
        ))
        .await;
    assert_eq!(
        reply.reply_text.as_deref(),
        Some(templates.form_received.as_str())
    );

    let lead = lead(&gw, USER).await;
    assert_eq!(lead.state, LeadState::FormCompleted);

    let mut conn = gw.store().pool().acquire().await.unwrap();
    let form = gw
        .store()
        .get_form(&mut conn, &lead.lead_id)
        .await
        .unwrap()
        .unwrap();
    drop(conn);
    assert!(form.completed);
    assert_eq!(form.biodata.as_deref(), Some("Budi, Jakarta"));
    assert_eq!(form.source_info.as_deref(), Some("Instagram"));
    assert_eq!(form.business_type.as_deref(), Some("F&B"));
    assert_eq!(form.budget.as_deref(), Some("100 juta"));
    assert_eq!(form.start_plan.as_deref(), Some("3 bulan lagi"));

    // One spreadsheet sync; new_lead + form_completed notifications.
    assert_eq!(
        gw.store().pending_job_count(QUEUE_SPREADSHEET_SYNC).await.unwrap(),
        1
    );
    assert_eq!(
        gw.store().pending_job_count(QUEUE_OPERATOR_NOTIFY).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_incremental_form_accumulates() {
    let gw = test_gateway().await;
    let templates = ReplyTemplates::default();

    gw.handle_message(&wa("m1", "Halo")).await;
    gw.handle_message(&wa("m2", "1")).await;

    // Half a form first: missing fields are itemized back.
    let reply = gw
        .handle_message(&wa("m3", "Nama: Budi, Jakarta\nSumber info: Instagram"))
        .await;
    let text = reply.reply_text.unwrap();
    assert!(text.contains("Jenis bisnis"));
    assert!(text.contains("Budget"));
    assert!(text.contains("Rencana mulai"));
    assert_eq!(lead(&gw, USER).await.state, LeadState::FormInProgress);

    // The rest completes it.
    let reply = gw
        .handle_message(&wa(
            "m4",
            "Jenis bisnis: kuliner\nBudget: 50 juta\nRencana mulai: segera",
        ))
        .await;
    assert_eq!(
        reply.reply_text.as_deref(),
        Some(templates.form_received.as_str())
    );
    assert_eq!(lead(&gw, USER).await.state, LeadState::FormCompleted);
}

#[tokio::test]
async fn test_duplicate_webhook_is_inert() {
    let gw = test_gateway().await;

    let msg = wa("m1", "Halo");
    let first = gw.handle_message(&msg).await;
    assert!(first.should_reply);

    let lead_before = lead(&gw, USER).await;
    let count_before = interaction_count(&gw, &lead_before.lead_id).await;
    let notify_before = gw.store().pending_job_count(QUEUE_OPERATOR_NOTIFY).await.unwrap();

    // handle(msg); handle(msg) == handle(msg).
    let second = gw.handle_message(&msg).await;
    assert!(second.success);
    assert!(!second.should_reply);

    let lead_after = lead(&gw, USER).await;
    assert_eq!(lead_after.state, lead_before.state);
    assert_eq!(
        interaction_count(&gw, &lead_after.lead_id).await,
        count_before
    );
    assert_eq!(
        gw.store().pending_job_count(QUEUE_OPERATOR_NOTIFY).await.unwrap(),
        notify_before
    );
}

#[tokio::test]
async fn test_three_invalid_options_escalate() {
    let gw = test_gateway().await;
    let templates = ReplyTemplates::default();

    gw.handle_message(&wa("m1", "Halo")).await;

    let reply = gw.handle_message(&wa("m2", "x")).await;
    assert_eq!(
        reply.reply_text.as_deref(),
        Some(templates.invalid_option.as_str())
    );
    assert_eq!(lead(&gw, USER).await.warning_count, 1);

    let reply = gw.handle_message(&wa("m3", "y")).await;
    assert_eq!(
        reply.reply_text.as_deref(),
        Some(templates.invalid_option.as_str())
    );
    assert_eq!(lead(&gw, USER).await.warning_count, 2);

    let reply = gw.handle_message(&wa("m4", "z")).await;
    assert_eq!(
        reply.reply_text.as_deref(),
        Some(templates.escalation_notice.as_str())
    );

    let escalated = lead(&gw, USER).await;
    assert_eq!(escalated.warning_count, 3);
    assert_eq!(escalated.state, LeadState::ManualIntervention);

    // new_lead + one escalation.
    assert_eq!(
        gw.store().pending_job_count(QUEUE_OPERATOR_NOTIFY).await.unwrap(),
        2
    );

    // Under operator care the bot stays silent, but still logs.
    let reply = gw.handle_message(&wa("m5", "halo??")).await;
    assert!(reply.success);
    assert!(!reply.should_reply);
    assert_eq!(interaction_count(&gw, &escalated.lead_id).await, 5);
}

#[tokio::test]
async fn test_partnership_option() {
    let gw = test_gateway().await;
    let templates = ReplyTemplates::default();

    gw.handle_message(&wa("m1", "Halo")).await;
    let reply = gw.handle_message(&wa("m2", "2")).await;
    assert_eq!(
        reply.reply_text.as_deref(),
        Some(templates.partnership_ack.as_str())
    );
    assert_eq!(lead(&gw, USER).await.state, LeadState::ManualIntervention);
    // new_lead + partnership_interest.
    assert_eq!(
        gw.store().pending_job_count(QUEUE_OPERATOR_NOTIFY).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_own_outbound_marks_existing() {
    let gw = test_gateway().await;

    let mut msg = wa("m1", "halo, menindaklanjuti pesanan Anda");
    msg.from_me = true;

    let reply = gw.handle_message(&msg).await;
    assert!(reply.success);
    assert!(!reply.should_reply);

    let lead_row = lead(&gw, USER).await;
    assert_eq!(lead_row.state, LeadState::Existing);
    assert_eq!(interaction_count(&gw, &lead_row.lead_id).await, 1);

    // The human's answer stays bot-silent: EXISTING never auto-replies.
    let reply = gw.handle_message(&wa("m2", "Halo")).await;
    assert!(reply.success);
    assert!(!reply.should_reply);
    assert_eq!(lead(&gw, USER).await.state, LeadState::Existing);
}

#[tokio::test]
async fn test_cooldown_swallows_but_logs() {
    let mut cfg = test_config();
    cfg.kv.user_cooldown_seconds = 30;
    let gw = gateway_with(&cfg, Arc::new(MemoryKv::new())).await;

    let first = gw.handle_message(&wa("m1", "Halo")).await;
    assert!(first.should_reply);

    // Within the cooldown the interaction is logged, no reply, no transition.
    let second = gw.handle_message(&wa("m2", "1")).await;
    assert!(second.success);
    assert!(!second.should_reply);

    let lead_row = lead(&gw, USER).await;
    assert_eq!(lead_row.state, LeadState::ChooseOption);
    assert_eq!(interaction_count(&gw, &lead_row.lead_id).await, 2);
}

#[tokio::test]
async fn test_post_form_contact_hands_off() {
    let gw = test_gateway().await;
    let templates = ReplyTemplates::default();

    gw.handle_message(&wa("m1", "Halo")).await;
    gw.handle_message(&wa("m2", "1")).await;
    gw.handle_message(&wa(
        "m3",
        "Nama: Budi, Jakarta\nSumber: Instagram\nJenis bisnis: F&B\nBudget: 100 juta\nRencana mulai: segera",
    ))
    .await;
    assert_eq!(lead(&gw, USER).await.state, LeadState::FormCompleted);

    // Contact after completion: one handoff reply, then operator care.
    let reply = gw.handle_message(&wa("m4", "kapan dihubungi?")).await;
    assert_eq!(
        reply.reply_text.as_deref(),
        Some(templates.question_received.as_str())
    );
    assert_eq!(lead(&gw, USER).await.state, LeadState::ManualIntervention);

    // new_lead + form_completed + escalation (post_form_contact).
    assert_eq!(
        gw.store().pending_job_count(QUEUE_OPERATOR_NOTIFY).await.unwrap(),
        3
    );
}

#[tokio::test]
async fn test_lock_contention_leaves_message_redeliverable() {
    let cfg = test_config();
    let kv = Arc::new(MemoryKv::new());
    let gw = gateway_with(&cfg, kv.clone()).await;

    // Another worker holds this user's mutex.
    let foreign = UserLock::new(kv.clone(), Duration::from_secs(30));
    let token = foreign.acquire(USER).await.unwrap();

    let reply = gw.handle_message(&wa("m1", "Halo")).await;
    assert!(!reply.success);
    assert!(!reply.should_reply);

    // The dedup marker was rolled back, so the redelivery goes through.
    foreign.release(USER, &token).await;
    let reply = gw.handle_message(&wa("m1", "Halo")).await;
    assert!(reply.success);
    assert!(reply.should_reply);
    assert_eq!(lead(&gw, USER).await.state, LeadState::ChooseOption);
}

#[tokio::test]
async fn test_alt_identifier_attaches_to_lead() {
    let gw = test_gateway().await;

    let mut msg = wa("m1", "Halo");
    msg.metadata.alt_id = Some("98765432101@lid".into());
    gw.handle_message(&msg).await;

    let lead_row = lead(&gw, USER).await;
    assert_eq!(lead_row.alt_id.as_deref(), Some("98765432101@lid"));
}

#[tokio::test]
async fn test_telegram_message_flows_through_same_pipeline() {
    let gw = test_gateway().await;
    let templates = ReplyTemplates::default();

    let msg = InboundMessage {
        transport: Transport::Telegram,
        message_id: "42:7".into(),
        user_id: "42".into(),
        text: "hello".into(),
        from_me: false,
        is_group: false,
        is_broadcast: false,
        timestamp: Utc::now(),
        metadata: MessageMeta {
            alt_id: None,
            phone: None,
            push_name: Some("@budi_s".into()),
        },
    };

    let reply = gw.handle_message(&msg).await;
    assert_eq!(reply.reply_text.as_deref(), Some(templates.welcome.as_str()));
    assert_eq!(lead(&gw, "42").await.state, LeadState::ChooseOption);
    assert_eq!(lead(&gw, "42").await.transport, "telegram");
}
