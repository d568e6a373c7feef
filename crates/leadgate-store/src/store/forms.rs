//! Form fragment accumulation.

use super::Store;
use leadgate_core::error::LeadgateError;
use leadgate_core::form::FormPatch;
use sqlx::SqliteConnection;

/// One row of `lead_form_data`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FormRecord {
    pub lead_id: String,
    pub biodata: Option<String>,
    pub source_info: Option<String>,
    pub business_type: Option<String>,
    pub budget: Option<String>,
    pub start_plan: Option<String>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl FormRecord {
    /// View of the stored fields as a patch, for merging with newly parsed text.
    pub fn as_patch(&self) -> FormPatch {
        FormPatch {
            biodata: self.biodata.clone(),
            source_info: self.source_info.clone(),
            business_type: self.business_type.clone(),
            budget: self.budget.clone(),
            start_plan: self.start_plan.clone(),
        }
    }
}

impl Store {
    pub async fn get_form(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
    ) -> Result<Option<FormRecord>, LeadgateError> {
        sqlx::query_as(
            "SELECT lead_id, biodata, source_info, business_type, budget, start_plan, \
                    completed, created_at, updated_at \
             FROM lead_form_data WHERE lead_id = ?",
        )
        .bind(lead_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("get_form failed: {e}")))
    }

    /// Upsert a parsed patch into the lead's fragment.
    ///
    /// Field-wise merge: a non-null incoming value replaces the stored one,
    /// a null incoming value preserves it. Fields only ever fill in or get
    /// overwritten by fresh answers; they never revert to empty.
    pub async fn upsert_form(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
        patch: &FormPatch,
    ) -> Result<FormRecord, LeadgateError> {
        sqlx::query(
            "INSERT INTO lead_form_data (lead_id, biodata, source_info, business_type, budget, start_plan) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(lead_id) DO UPDATE SET \
                 biodata = COALESCE(excluded.biodata, lead_form_data.biodata), \
                 source_info = COALESCE(excluded.source_info, lead_form_data.source_info), \
                 business_type = COALESCE(excluded.business_type, lead_form_data.business_type), \
                 budget = COALESCE(excluded.budget, lead_form_data.budget), \
                 start_plan = COALESCE(excluded.start_plan, lead_form_data.start_plan), \
                 updated_at = datetime('now')",
        )
        .bind(lead_id)
        .bind(&patch.biodata)
        .bind(&patch.source_info)
        .bind(&patch.business_type)
        .bind(&patch.budget)
        .bind(&patch.start_plan)
        .execute(&mut *conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("upsert_form failed: {e}")))?;

        self.get_form(conn, lead_id)
            .await?
            .ok_or_else(|| LeadgateError::Store(format!("form for {lead_id} missing after upsert")))
    }

    /// Flag the fragment complete. Only called once all five fields are
    /// non-empty; the completeness check lives in `leadgate_core::form`.
    pub async fn mark_form_completed(
        &self,
        conn: &mut SqliteConnection,
        lead_id: &str,
    ) -> Result<(), LeadgateError> {
        sqlx::query(
            "UPDATE lead_form_data SET completed = 1, updated_at = datetime('now') \
             WHERE lead_id = ?",
        )
        .bind(lead_id)
        .execute(conn)
        .await
        .map_err(|e| LeadgateError::Store(format!("mark_form_completed failed: {e}")))?;
        Ok(())
    }
}
