//! Background outbox runner.
//!
//! Polls due jobs and delivers them: completed forms go to the spreadsheet
//! webhook, operator notifications go to the configured Telegram chat.
//! Failures reschedule with exponential backoff until the per-queue attempt
//! cap. Downstream endpoints must tolerate a rare duplicate delivery.

use leadgate_channels::telegram::send::TelegramClient;
use leadgate_core::config::JobsConfig;
use leadgate_core::error::LeadgateError;
use leadgate_store::{Job, NotificationKind, Store, QUEUE_OPERATOR_NOTIFY, QUEUE_SPREADSHEET_SYNC};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Retry backoff bases per queue, in milliseconds.
const SPREADSHEET_BACKOFF_BASE_MS: u64 = 1_000;
const NOTIFY_BACKOFF_BASE_MS: u64 = 500;

/// How many due jobs one poll round picks up.
const DRAIN_BATCH: i64 = 20;

/// Drains the job outbox.
pub struct JobRunner {
    store: Store,
    config: JobsConfig,
    http: reqwest::Client,
    telegram: Option<TelegramClient>,
}

impl JobRunner {
    pub fn new(store: Store, config: JobsConfig, telegram: Option<TelegramClient>) -> Self {
        Self {
            store,
            config,
            http: reqwest::Client::new(),
            telegram,
        }
    }

    /// Poll loop; spawned as a background task.
    pub async fn run(self) {
        info!(
            "job runner started (poll every {}s)",
            self.config.poll_interval_secs
        );
        loop {
            if let Err(e) = self.drain().await {
                error!("job drain round failed: {e}");
            }
            tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
        }
    }

    /// Deliver everything currently due.
    pub async fn drain(&self) -> Result<(), LeadgateError> {
        for job in self.store.due_jobs(DRAIN_BATCH).await? {
            match self.deliver(&job).await {
                Ok(()) => {
                    self.store.complete_job(&job.id).await?;
                    debug!("job {} ({}) delivered", job.id, job.queue);
                }
                Err(e) => {
                    let base = match job.queue.as_str() {
                        QUEUE_SPREADSHEET_SYNC => SPREADSHEET_BACKOFF_BASE_MS,
                        _ => NOTIFY_BACKOFF_BASE_MS,
                    };
                    let retrying = self
                        .store
                        .fail_job(&job.id, &e.to_string(), base)
                        .await?;
                    if retrying {
                        warn!("job {} ({}) failed, will retry: {e}", job.id, job.queue);
                    } else {
                        error!("job {} ({}) permanently failed: {e}", job.id, job.queue);
                    }
                }
            }
        }
        Ok(())
    }

    async fn deliver(&self, job: &Job) -> Result<(), LeadgateError> {
        let payload: serde_json::Value = serde_json::from_str(&job.payload)?;
        match job.queue.as_str() {
            QUEUE_SPREADSHEET_SYNC => self.deliver_spreadsheet(&payload).await,
            QUEUE_OPERATOR_NOTIFY => self.deliver_notification(&payload).await,
            other => Err(LeadgateError::Queue(format!("unknown queue: {other}"))),
        }
    }

    /// Forward the completed form to the spreadsheet endpoint.
    async fn deliver_spreadsheet(&self, payload: &serde_json::Value) -> Result<(), LeadgateError> {
        if self.config.spreadsheet_webhook_url.is_empty() {
            warn!("spreadsheet_webhook_url not configured, dropping sync job");
            return Ok(());
        }

        let resp = self
            .http
            .post(&self.config.spreadsheet_webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| LeadgateError::Queue(format!("spreadsheet sync failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LeadgateError::Queue(format!(
                "spreadsheet sync failed ({status}): {body}"
            )));
        }
        Ok(())
    }

    /// Send an operator notification to the configured chat.
    async fn deliver_notification(&self, payload: &serde_json::Value) -> Result<(), LeadgateError> {
        let text = format_notification(payload);

        let (Some(client), chat_id) = (&self.telegram, &self.config.operator_chat_id) else {
            info!("operator notification (no channel configured): {text}");
            return Ok(());
        };
        if chat_id.is_empty() {
            info!("operator notification (no chat configured): {text}");
            return Ok(());
        }

        client.send_text(chat_id, &text).await
    }
}

/// Render a notification payload into the operator-facing message.
fn format_notification(payload: &serde_json::Value) -> String {
    let kind = payload
        .get("kind")
        .and_then(|k| k.as_str())
        .and_then(NotificationKind::parse);
    let data = payload.get("data").cloned().unwrap_or_default();
    let field = |name: &str| {
        data.get(name)
            .and_then(|v| v.as_str())
            .unwrap_or("-")
            .to_string()
    };

    match kind {
        Some(NotificationKind::Escalation) => format!(
            "\u{26a0} Escalation ({})\nUser: {} [{}]\nState: {} (warnings: {})\nLast message: {}",
            field("reason"),
            field("user_id"),
            field("transport"),
            field("current_state"),
            data.get("warning_count")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            field("last_message"),
        ),
        Some(NotificationKind::NewLead) => format!(
            "\u{1f195} New lead: {} ({}) [{}]",
            field("user_id"),
            field("push_name"),
            field("transport"),
        ),
        Some(NotificationKind::FormCompleted) => format!(
            "\u{2705} Form completed by {} [{}]",
            field("user_id"),
            field("transport"),
        ),
        Some(NotificationKind::PartnershipInterest) => format!(
            "\u{1f91d} Partnership interest from {} [{}]",
            field("user_id"),
            field("transport"),
        ),
        Some(NotificationKind::OtherNeeds) => format!(
            "\u{1f4ec} Other needs from {} [{}]: {}",
            field("user_id"),
            field("transport"),
            field("last_message"),
        ),
        Some(NotificationKind::GeneralInquiry) => format!(
            "\u{2753} Inquiry from {} [{}]: {}",
            field("user_id"),
            field("transport"),
            field("last_message"),
        ),
        None => format!("Operator notification: {payload}"),
    }
}
