//! Append-only interaction log.

use super::Store;
use leadgate_core::error::LeadgateError;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Message direction relative to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl Store {
    /// Append one interaction to a lead's log.
    pub async fn add_interaction(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
        message_id: Option<&str>,
        text: &str,
        direction: Direction,
    ) -> Result<(), LeadgateError> {
        sqlx::query(
            "INSERT INTO lead_interactions (interaction_id, lead_id, message_id, text, direction) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(lead_id)
        .bind(message_id)
        .bind(text)
        .bind(direction.as_str())
        .execute(conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("add_interaction failed: {e}")))?;
        Ok(())
    }

    /// Number of interactions logged for a lead.
    pub async fn interaction_count(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
    ) -> Result<i64, LeadgateError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM lead_interactions WHERE lead_id = ?")
                .bind(lead_id)
                .fetch_one(conn)
                .await
                .map_err(|e| LeadgateError::Store(format!("interaction_count failed: {e}")))?;
        Ok(count)
    }

    /// Most recent interaction texts for a lead, newest first.
    pub async fn recent_interactions(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
        limit: i64,
    ) -> Result<Vec<(String, String)>, LeadgateError> {
        // Returns: (direction, text)
        sqlx::query_as(
            "SELECT direction, text FROM lead_interactions \
             WHERE lead_id = ? ORDER BY created_at DESC, interaction_id DESC LIMIT ?",
        )
        .bind(lead_id)
        .bind(limit)
        .fetch_all(conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("recent_interactions failed: {e}")))
    }
}
