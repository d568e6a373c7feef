//! Primary/alternate identifier reconciliation.
//!
//! The transport may present two identifier shapes for one human: a
//! phone-style primary and a linked-device alternate. This module keeps the
//! invariant that any observed `(primary, alt)` pair maps to at most one
//! lead.

use super::leads::Lead;
use super::Store;
use leadgate_core::error::LeadgateError;
use sqlx::SqliteConnection;
use tracing::info;

impl Store {
    /// Reconcile a `(primary, alt)` identifier pair to a single lead.
    ///
    /// - Primary known: attach `alt` if absent, return that lead.
    /// - Only an alt-matching lead exists: migrate it to the primary id.
    /// - Both exist as separate leads (split-brain): fold the alt-only lead
    ///   into the primary one. Its interactions are re-parented first, so
    ///   the merge is safe even when the alt lead was not a bare sync
    ///   import; then the alt row is deleted.
    /// - Neither known: `None`, the caller creates.
    pub async fn resolve_identity(
        &self,
        conn: &mut SqliteConnection,
        primary_id: &str,
        alt_id: &str,
    ) -> Result<Option<Lead>, LeadgateError> {
        let primary_lead = self.get_by_primary(&mut *conn, primary_id).await?;

        // A sync import may have keyed the lead by the alternate id directly,
        // so look at both columns.
        let alt_lead = match self.get_by_primary(&mut *conn, alt_id).await? {
            Some(lead) => Some(lead),
            None => self.get_by_alt(&mut *conn, alt_id).await?,
        };

        match (primary_lead, alt_lead) {
            (Some(primary), Some(alt)) if primary.lead_id != alt.lead_id => {
                self.merge_into(conn, &primary, &alt).await?;
                self.attach_alt(conn, &primary.lead_id, alt_id).await?;
                Ok(Some(self.require_lead(conn, &primary.lead_id).await?))
            }
            (Some(primary), _) => {
                if primary.alt_id.is_none() {
                    self.attach_alt(conn, &primary.lead_id, alt_id).await?;
                    return Ok(Some(self.require_lead(conn, &primary.lead_id).await?));
                }
                Ok(Some(primary))
            }
            (None, Some(alt)) => {
                info!(
                    "migrating lead {} from alt identifier to primary {primary_id}",
                    alt.lead_id
                );
                sqlx::query(
                    "UPDATE leads SET primary_id = ?, alt_id = ?, updated_at = datetime('now') \
                     WHERE lead_id = ?",
                )
                .bind(primary_id)
                .bind(alt_id)
                .bind(&alt.lead_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| LeadgateError::Store(format!("identity migration failed: {e}")))?;
                Ok(Some(self.require_lead(conn, &alt.lead_id).await?))
            }
            (None, None) => Ok(None),
        }
    }

    /// Fold `alt` into `primary` and delete the `alt` row.
    async fn merge_into(
        &self,
        conn: &mut SqliteConnection,
        primary: &Lead,
        alt: &Lead,
    ) -> Result<(), LeadgateError> {
        info!(
            "merging split-brain lead {} into {}",
            alt.lead_id, primary.lead_id
        );

        sqlx::query("UPDATE lead_interactions SET lead_id = ? WHERE lead_id = ?")
            .bind(&primary.lead_id)
            .bind(&alt.lead_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| LeadgateError::Store(format!("interaction re-parent failed: {e}")))?;

        // Keep whichever form fragment survives: the primary's wins, an
        // alt-only fragment is re-parented.
        let primary_has_form = self.get_form(&mut *conn, &primary.lead_id).await?.is_some();
        if primary_has_form {
            sqlx::query("DELETE FROM lead_form_data WHERE lead_id = ?")
                .bind(&alt.lead_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| LeadgateError::Store(format!("form cleanup failed: {e}")))?;
        } else {
            sqlx::query("UPDATE lead_form_data SET lead_id = ? WHERE lead_id = ?")
                .bind(&primary.lead_id)
                .bind(&alt.lead_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| LeadgateError::Store(format!("form re-parent failed: {e}")))?;
        }

        sqlx::query("DELETE FROM leads WHERE lead_id = ?")
            .bind(&alt.lead_id)
            .execute(conn)
            .await
            .map_err(|e| LeadgateError::Store(format!("split-brain delete failed: {e}")))?;

        Ok(())
    }

    async fn attach_alt(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
        alt_id: &str,
    ) -> Result<(), LeadgateError> {
        sqlx::query(
            "UPDATE leads SET alt_id = COALESCE(alt_id, ?), updated_at = datetime('now') \
             WHERE lead_id = ?",
        )
        .bind(alt_id)
        .bind(lead_id)
        .execute(conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("attach_alt failed: {e}")))?;
        Ok(())
    }
}
