//! Transactional job outbox.
//!
//! Jobs are enqueued inside the handler's outer transaction, so a rollback
//! makes them invisible. A background runner drains due rows and applies
//! per-queue retry policies with exponential backoff.

use super::Store;
use leadgate_core::error::LeadgateError;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Queue receiving completed form payloads for spreadsheet sync.
pub const QUEUE_SPREADSHEET_SYNC: &str = "spreadsheet-sync";

/// Queue receiving operator notifications.
pub const QUEUE_OPERATOR_NOTIFY: &str = "operator-notify";

/// What an operator notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Escalation,
    NewLead,
    FormCompleted,
    PartnershipInterest,
    OtherNeeds,
    GeneralInquiry,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escalation => "escalation",
            Self::NewLead => "new_lead",
            Self::FormCompleted => "form_completed",
            Self::PartnershipInterest => "partnership_interest",
            Self::OtherNeeds => "other_needs",
            Self::GeneralInquiry => "general_inquiry",
        }
    }

    /// Parse the kind back out of a queued payload.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "escalation" => Some(Self::Escalation),
            "new_lead" => Some(Self::NewLead),
            "form_completed" => Some(Self::FormCompleted),
            "partnership_interest" => Some(Self::PartnershipInterest),
            "other_needs" => Some(Self::OtherNeeds),
            "general_inquiry" => Some(Self::GeneralInquiry),
            _ => None,
        }
    }
}

/// One row of the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: String,
    pub queue: String,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub run_at: String,
    pub last_error: Option<String>,
}

const JOB_COLUMNS: &str = "id, queue, payload, status, attempts, max_attempts, run_at, last_error";

impl Store {
    /// Enqueue a job inside the caller's transaction.
    pub async fn enqueue_job(
        &self,
        conn: &mut SqliteConnection,
        queue: &str,
        payload: &serde_json::Value,
        max_attempts: u32,
    ) -> Result<String, LeadgateError> {
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(payload)
            .map_err(|e| LeadgateError::Queue(format!("payload serialize failed: {e}")))?;

        sqlx::query("INSERT INTO jobs (id, queue, payload, max_attempts) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(queue)
            .bind(&payload)
            .bind(max_attempts as i64)
            .execute(conn)
            .await
            .map_err(|e| LeadgateError::Queue(format!("enqueue failed: {e}")))?;

        Ok(id)
    }

    /// Jobs that are due for delivery, oldest first.
    pub async fn due_jobs(&self, limit: i64) -> Result<Vec<Job>, LeadgateError> {
        sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE status = 'pending' AND datetime(run_at) <= datetime('now') \
             ORDER BY datetime(run_at) ASC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| LeadgateError::Queue(format!("due_jobs failed: {e}")))
    }

    /// Mark a job delivered.
    pub async fn complete_job(&self, id: &str) -> Result<(), LeadgateError> {
        sqlx::query("UPDATE jobs SET status = 'done' WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| LeadgateError::Queue(format!("complete_job failed: {e}")))?;
        Ok(())
    }

    /// Record a delivery failure: reschedule with exponential backoff until
    /// the attempt cap, then mark the job permanently failed.
    ///
    /// Returns `true` if the job will be retried.
    pub async fn fail_job(
        &self,
        id: &str,
        error: &str,
        backoff_base_ms: u64,
    ) -> Result<bool, LeadgateError> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT attempts, max_attempts FROM jobs WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| LeadgateError::Queue(format!("fail_job fetch failed: {e}")))?;

        let Some((attempts, max_attempts)) = row else {
            return Ok(false);
        };
        let new_attempts = attempts + 1;

        if new_attempts < max_attempts {
            let delay_secs =
                (backoff_base_ms as f64 / 1000.0) * 2f64.powi((new_attempts - 1) as i32);
            sqlx::query(&format!(
                "UPDATE jobs SET attempts = ?, last_error = ?, \
                     run_at = datetime('now', '+{delay_secs:.3} seconds') \
                 WHERE id = ?"
            ))
            .bind(new_attempts)
            .bind(error)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| LeadgateError::Queue(format!("fail_job retry update failed: {e}")))?;
            Ok(true)
        } else {
            sqlx::query("UPDATE jobs SET status = 'failed', attempts = ?, last_error = ? WHERE id = ?")
                .bind(new_attempts)
                .bind(error)
                .bind(id)
                .execute(self.pool())
                .await
                .map_err(|e| LeadgateError::Queue(format!("fail_job final update failed: {e}")))?;
            Ok(false)
        }
    }

    /// Pending jobs on a queue, regardless of due time.
    pub async fn pending_job_count(&self, queue: &str) -> Result<i64, LeadgateError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE queue = ? AND status = 'pending'")
                .bind(queue)
                .fetch_one(self.pool())
                .await
                .map_err(|e| LeadgateError::Queue(format!("pending_job_count failed: {e}")))?;
        Ok(count)
    }
}
