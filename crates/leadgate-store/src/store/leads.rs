//! Lead lifecycle: creation, lookup, state transitions, warning counter.

use super::Store;
use leadgate_core::error::LeadgateError;
use leadgate_core::message::Transport;
use leadgate_core::state::{attempt_transition, LeadState};
use sqlx::SqliteConnection;
use uuid::Uuid;

pub(super) const LEAD_COLUMNS: &str = "lead_id, primary_id, alt_id, push_name, transport, \
     state, warning_count, created_at, updated_at";

/// One row of the `leads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Lead {
    pub lead_id: String,
    pub primary_id: String,
    pub alt_id: Option<String>,
    pub push_name: Option<String>,
    pub transport: String,
    #[sqlx(try_from = "String")]
    pub state: LeadState,
    pub warning_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Optional metadata carried by an inbound message.
#[derive(Debug, Clone, Default)]
pub struct LeadOptions {
    pub push_name: Option<String>,
    pub alt_id: Option<String>,
}

impl Store {
    pub async fn get_by_primary(
        &self,
        conn: &mut SqliteConnection,
        primary_id: &str,
    ) -> Result<Option<Lead>, LeadgateError> {
        sqlx::query_as(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE primary_id = ?"
        ))
        .bind(primary_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("get_by_primary failed: {e}")))
    }

    pub async fn get_by_alt(
        &self,
        conn: &mut SqliteConnection,
        alt_id: &str,
    ) -> Result<Option<Lead>, LeadgateError> {
        sqlx::query_as(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE alt_id = ?"))
            .bind(alt_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| LeadgateError::Store(format!("get_by_alt failed: {e}")))
    }

    pub async fn get_by_lead_id(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
    ) -> Result<Option<Lead>, LeadgateError> {
        sqlx::query_as(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE lead_id = ?"))
            .bind(lead_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| LeadgateError::Store(format!("get_by_lead_id failed: {e}")))
    }

    /// Insert a new lead.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        primary_id: &str,
        transport: Transport,
        state: LeadState,
        options: &LeadOptions,
    ) -> Result<Lead, LeadgateError> {
        let lead_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO leads (lead_id, primary_id, alt_id, push_name, transport, state) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&lead_id)
        .bind(primary_id)
        .bind(&options.alt_id)
        .bind(&options.push_name)
        .bind(transport.as_str())
        .bind(state.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("create lead failed: {e}")))?;

        self.require_lead(conn, &lead_id).await
    }

    /// Fetch the lead for `primary_id`, creating it in NEW if absent.
    ///
    /// When found, a changed `push_name` is refreshed and a newly observed
    /// `alt_id` is attached (never overwritten); anything else is returned
    /// unchanged. The bool is true when the lead was just created.
    pub async fn get_or_create(
        &self,
        conn: &mut SqliteConnection,
        primary_id: &str,
        transport: Transport,
        options: &LeadOptions,
    ) -> Result<(Lead, bool), LeadgateError> {
        if let Some(lead) = self.get_by_primary(&mut *conn, primary_id).await? {
            let refresh_name = options
                .push_name
                .as_ref()
                .is_some_and(|n| lead.push_name.as_ref() != Some(n));
            let attach_alt = options.alt_id.is_some() && lead.alt_id.is_none();

            if refresh_name || attach_alt {
                sqlx::query(
                    "UPDATE leads SET \
                         push_name = COALESCE(?, push_name), \
                         alt_id = COALESCE(alt_id, ?), \
                         updated_at = datetime('now') \
                     WHERE lead_id = ?",
                )
                .bind(&options.push_name)
                .bind(&options.alt_id)
                .bind(&lead.lead_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| LeadgateError::Store(format!("lead refresh failed: {e}")))?;

                return Ok((self.require_lead(conn, &lead.lead_id).await?, false));
            }
            return Ok((lead, false));
        }

        let lead = self
            .create(conn, primary_id, transport, LeadState::New, options)
            .await?;
        Ok((lead, true))
    }

    /// Record that we contacted this identity ourselves.
    ///
    /// Absent lead: created directly in EXISTING. A NEW lead is moved to
    /// EXISTING. This is a reactive bookkeeping path, not a conversational
    /// transition, so it bypasses the transition table. Any other state is
    /// left untouched.
    pub async fn mark_existing(
        &self,
        conn: &mut SqliteConnection,
        primary_id: &str,
        transport: Transport,
    ) -> Result<Lead, LeadgateError> {
        match self.get_by_primary(&mut *conn, primary_id).await? {
            None => {
                self.create(
                    conn,
                    primary_id,
                    transport,
                    LeadState::Existing,
                    &LeadOptions::default(),
                )
                .await
            }
            Some(lead) if lead.state == LeadState::New => {
                sqlx::query(
                    "UPDATE leads SET state = ?, updated_at = datetime('now') WHERE lead_id = ?",
                )
                .bind(LeadState::Existing.as_str())
                .bind(&lead.lead_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| LeadgateError::Store(format!("mark_existing failed: {e}")))?;
                self.require_lead(conn, &lead.lead_id).await
            }
            Some(lead) => Ok(lead),
        }
    }

    /// Transition a lead, validating against the state machine.
    ///
    /// Runs inside the caller's transaction; an `InvalidTransition` leaves
    /// the row untouched and rolls the whole message back with it.
    pub async fn update_state(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
        new_state: LeadState,
    ) -> Result<Lead, LeadgateError> {
        let lead = self.require_lead(&mut *conn, lead_id).await?;
        let next = attempt_transition(lead.state, new_state)?;

        sqlx::query("UPDATE leads SET state = ?, updated_at = datetime('now') WHERE lead_id = ?")
            .bind(next.as_str())
            .bind(lead_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| LeadgateError::Store(format!("update_state failed: {e}")))?;

        self.require_lead(conn, lead_id).await
    }

    /// Bump the warning counter, capped at `max_warnings`.
    ///
    /// Returns the updated lead and whether the cap was reached (time to
    /// escalate to an operator).
    pub async fn increment_warning(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
        max_warnings: i64,
    ) -> Result<(Lead, bool), LeadgateError> {
        sqlx::query(
            "UPDATE leads SET \
                 warning_count = MIN(warning_count + 1, ?), \
                 updated_at = datetime('now') \
             WHERE lead_id = ?",
        )
        .bind(max_warnings)
        .bind(lead_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("increment_warning failed: {e}")))?;

        let lead = self.require_lead(conn, lead_id).await?;
        let should_escalate = lead.warning_count >= max_warnings;
        Ok((lead, should_escalate))
    }

    /// Reset the warning counter (admin action).
    pub async fn reset_warning(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
    ) -> Result<(), LeadgateError> {
        sqlx::query(
            "UPDATE leads SET warning_count = 0, updated_at = datetime('now') WHERE lead_id = ?",
        )
        .bind(lead_id)
        .execute(conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("reset_warning failed: {e}")))?;
        Ok(())
    }

    pub(super) async fn require_lead(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
    ) -> Result<Lead, LeadgateError> {
        self.get_by_lead_id(conn, lead_id)
            .await?
            .ok_or_else(|| LeadgateError::Store(format!("lead {lead_id} not found")))
    }
}
