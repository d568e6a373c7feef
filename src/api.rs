//! Webhook HTTP server.
//!
//! Both transport webhooks always answer HTTP 200 so upstream gateways
//! never enter retry storms; failures live in the response body and the
//! logs. Reply delivery happens off the request path.

use crate::gateway::Gateway;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use leadgate_channels::telegram::{self, send::TelegramClient};
use leadgate_channels::whatsapp::{self, send::WahaClient};
use leadgate_core::config::ServerConfig;
use leadgate_core::message::{HandlerReply, InboundMessage};
use leadgate_store::{QUEUE_OPERATOR_NOTIFY, QUEUE_SPREADSHEET_SYNC};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Delay between the primary and secondary message of a two-part reply,
/// so they arrive in order at the client.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct ApiState {
    pub gateway: Arc<Gateway>,
    pub waha: Option<WahaClient>,
    pub telegram: Option<TelegramClient>,
    pub uptime: Instant,
}

/// Build the router with webhook and health routes.
pub fn router(state: ApiState, base_path: &str) -> Router {
    let base = base_path.trim_end_matches('/');
    Router::new()
        .route(&format!("{base}/waha/webhook"), post(waha_webhook))
        .route(&format!("{base}/telegram/webhook"), post(telegram_webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until shutdown.
pub async fn serve(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(state, &config.base_path);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("webhook server listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn ack(kind: &str) -> Json<Value> {
    Json(json!({"success": true, "type": kind}))
}

/// `POST {base}/waha/webhook` — inbound WhatsApp gateway events.
async fn waha_webhook(State(state): State<ApiState>, Json(body): Json<Value>) -> Json<Value> {
    let hook: whatsapp::types::WahaWebhook = match serde_json::from_value(body) {
        Ok(h) => h,
        Err(e) => {
            warn!("unparseable waha webhook: {e}");
            return Json(json!({"success": false, "type": "bad_payload"}));
        }
    };

    if !hook.is_message_event() {
        return ack("ignored");
    }
    let Some(payload) = hook.payload else {
        return ack("ignored");
    };

    let msg = whatsapp::parse_payload(&payload);

    if msg.from_me {
        // Our own group/broadcast traffic is nothing to bookkeep.
        if msg.is_group || msg.is_broadcast || msg.user_id.is_empty() {
            return ack("ignored");
        }
    } else if let Err(reason) = msg.validate() {
        return ack(reason.as_str());
    }

    let reply = state.gateway.handle_message(&msg).await;
    if let Some(client) = state.waha.clone() {
        deliver_whatsapp(client, &msg, &reply);
    }

    Json(json!({"success": reply.success}))
}

/// `POST {base}/telegram/webhook` — Bot API updates.
async fn telegram_webhook(State(state): State<ApiState>, Json(body): Json<Value>) -> Json<Value> {
    let update: telegram::types::TgUpdate = match serde_json::from_value(body) {
        Ok(u) => u,
        Err(e) => {
            warn!("unparseable telegram update: {e}");
            return Json(json!({"success": false, "type": "bad_payload"}));
        }
    };

    let Some(msg) = telegram::parse_update(&update) else {
        return ack("ignored");
    };
    if let Err(reason) = msg.validate() {
        return ack(reason.as_str());
    }

    let reply = state.gateway.handle_message(&msg).await;
    if let Some(client) = state.telegram.clone() {
        deliver_telegram(client, &msg, &reply);
    }

    Json(json!({"success": reply.success}))
}

/// `GET /health` — uptime and queue depth.
async fn health(State(state): State<ApiState>) -> Json<Value> {
    let store = state.gateway.store();
    let spreadsheet_pending = store
        .pending_job_count(QUEUE_SPREADSHEET_SYNC)
        .await
        .unwrap_or(-1);
    let notify_pending = store
        .pending_job_count(QUEUE_OPERATOR_NOTIFY)
        .await
        .unwrap_or(-1);

    Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
        "jobs": {
            "spreadsheet_sync_pending": spreadsheet_pending,
            "operator_notify_pending": notify_pending,
        },
    }))
}

/// Send the decided reply back through the WhatsApp gateway, off-path.
fn deliver_whatsapp(client: WahaClient, msg: &InboundMessage, reply: &HandlerReply) {
    let Some((primary, secondary)) = reply_texts(reply) else {
        return;
    };
    let chat_id = msg.user_id.clone();

    tokio::spawn(async move {
        if let Err(e) = client.send_text(&chat_id, &primary).await {
            error!("whatsapp reply to {chat_id} failed: {e}");
            return;
        }
        if let Some(secondary) = secondary {
            tokio::time::sleep(SETTLE_DELAY).await;
            if let Err(e) = client.send_text(&chat_id, &secondary).await {
                error!("whatsapp secondary reply to {chat_id} failed: {e}");
            }
        }
    });
}

/// Send the decided reply back through the Bot API, off-path.
fn deliver_telegram(client: TelegramClient, msg: &InboundMessage, reply: &HandlerReply) {
    let Some((primary, secondary)) = reply_texts(reply) else {
        return;
    };
    let chat_id = msg.user_id.clone();

    tokio::spawn(async move {
        if let Err(e) = client.send_text(&chat_id, &primary).await {
            error!("telegram reply to {chat_id} failed: {e}");
            return;
        }
        if let Some(secondary) = secondary {
            tokio::time::sleep(SETTLE_DELAY).await;
            if let Err(e) = client.send_text(&chat_id, &secondary).await {
                error!("telegram secondary reply to {chat_id} failed: {e}");
            }
        }
    });
}

fn reply_texts(reply: &HandlerReply) -> Option<(String, Option<String>)> {
    if !reply.should_reply {
        return None;
    }
    reply
        .reply_text
        .clone()
        .map(|primary| (primary, reply.secondary_text.clone()))
}
