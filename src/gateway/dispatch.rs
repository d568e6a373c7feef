//! Per-state message dispatch.
//!
//! Dispatch is driven by lead state and literal message content (the
//! `"1"`/`"2"`/`"3"` menu match); intent classification never decides.

use super::Gateway;
use chrono::Utc;
use leadgate_core::error::LeadgateError;
use leadgate_core::form;
use leadgate_core::message::{HandlerReply, InboundMessage};
use leadgate_core::state::LeadState;
use leadgate_core::templates::TemplateKey;
use leadgate_store::{
    Lead, NotificationKind, QUEUE_OPERATOR_NOTIFY, QUEUE_SPREADSHEET_SYNC,
};
use sqlx::SqliteConnection;
use tracing::info;

impl Gateway {
    pub(super) async fn dispatch(
        &self,
        tx: &mut SqliteConnection,
        lead: &Lead,
        msg: &InboundMessage,
    ) -> Result<HandlerReply, LeadgateError> {
        match lead.state {
            LeadState::New => self.handle_new(tx, lead).await,
            LeadState::ChooseOption => self.handle_choose_option(tx, lead, msg).await,
            LeadState::FormSent | LeadState::FormInProgress => {
                self.handle_form(tx, lead, msg).await
            }
            LeadState::FormCompleted => {
                self.handle_handoff(tx, lead, msg, "post_form_contact").await
            }
            LeadState::Partnership => {
                self.handle_handoff(tx, lead, msg, "partnership_followup").await
            }
            // Filtered out before dispatch; stay quiet if ever reached.
            LeadState::Existing | LeadState::ManualIntervention => Ok(HandlerReply::silent()),
        }
    }

    /// First contact: greet with the menu.
    async fn handle_new(
        &self,
        tx: &mut SqliteConnection,
        lead: &Lead,
    ) -> Result<HandlerReply, LeadgateError> {
        self.store
            .update_state(tx, &lead.lead_id, LeadState::ChooseOption)
            .await?;
        Ok(HandlerReply::reply(self.templates.get(TemplateKey::Welcome)))
    }

    /// Waiting on a 1/2/3 selection.
    async fn handle_choose_option(
        &self,
        tx: &mut SqliteConnection,
        lead: &Lead,
        msg: &InboundMessage,
    ) -> Result<HandlerReply, LeadgateError> {
        match msg.text.trim() {
            "1" => {
                self.store
                    .update_state(tx, &lead.lead_id, LeadState::FormSent)
                    .await?;
                // The ack and the blank form go out as two messages; the
                // adapter inserts the settle delay.
                Ok(HandlerReply::reply_with_secondary(
                    self.templates.get(TemplateKey::ChooseOptionAck),
                    self.templates.get(TemplateKey::FormTemplate),
                ))
            }
            "2" => {
                self.store
                    .update_state(tx, &lead.lead_id, LeadState::ManualIntervention)
                    .await?;
                self.notify(tx, NotificationKind::PartnershipInterest, msg).await?;
                Ok(HandlerReply::reply(
                    self.templates.get(TemplateKey::PartnershipAck),
                ))
            }
            "3" => {
                self.store
                    .update_state(tx, &lead.lead_id, LeadState::ManualIntervention)
                    .await?;
                self.notify(tx, NotificationKind::OtherNeeds, msg).await?;
                Ok(HandlerReply::reply(
                    self.templates.get(TemplateKey::OtherNeedsAck),
                ))
            }
            _ => {
                let (lead, should_escalate) = self
                    .store
                    .increment_warning(tx, &lead.lead_id, self.handler_config.max_warnings)
                    .await?;
                if should_escalate {
                    self.escalate(tx, &lead, msg, "max_warnings").await?;
                    Ok(HandlerReply::reply(
                        self.templates.get(TemplateKey::EscalationNotice),
                    ))
                } else {
                    Ok(HandlerReply::reply(
                        self.templates.get(TemplateKey::InvalidOption),
                    ))
                }
            }
        }
    }

    /// Collecting form answers, one or many per message.
    async fn handle_form(
        &self,
        tx: &mut SqliteConnection,
        lead: &Lead,
        msg: &InboundMessage,
    ) -> Result<HandlerReply, LeadgateError> {
        if lead.state == LeadState::FormSent {
            self.store
                .update_state(tx, &lead.lead_id, LeadState::FormInProgress)
                .await?;
        }

        let existing = self
            .store
            .get_form(tx, &lead.lead_id)
            .await?
            .map(|r| r.as_patch());
        let patch = form::parse(&msg.text);
        let validation = form::validate(&patch, existing.as_ref());
        self.store.upsert_form(tx, &lead.lead_id, &patch).await?;

        if validation.valid {
            self.store.mark_form_completed(tx, &lead.lead_id).await?;
            self.store
                .update_state(tx, &lead.lead_id, LeadState::FormCompleted)
                .await?;

            let merged = &validation.merged;
            self.store
                .enqueue_job(
                    tx,
                    QUEUE_SPREADSHEET_SYNC,
                    &serde_json::json!({
                        "lead_id": lead.lead_id,
                        "user_id": msg.user_id,
                        "transport": msg.transport.as_str(),
                        "form": {
                            "biodata": merged.biodata,
                            "source_info": merged.source_info,
                            "business_type": merged.business_type,
                            "budget": merged.budget,
                            "start_plan": merged.start_plan,
                        },
                    }),
                    self.jobs_config.spreadsheet_sync_max_attempts,
                )
                .await?;
            self.notify(tx, NotificationKind::FormCompleted, msg).await?;

            info!("form completed for {}", msg.user_id);
            Ok(HandlerReply::reply(
                self.templates.get(TemplateKey::FormReceived),
            ))
        } else {
            let (lead, should_escalate) = self
                .store
                .increment_warning(tx, &lead.lead_id, self.handler_config.max_warnings)
                .await?;
            if should_escalate {
                self.escalate(tx, &lead, msg, "max_warnings").await?;
                Ok(HandlerReply::reply(
                    self.templates.get(TemplateKey::EscalationNotice),
                ))
            } else {
                Ok(HandlerReply::reply(form::explain_missing(&validation.missing)))
            }
        }
    }

    /// Contact after the conversation already closed out: hand to an
    /// operator once, acknowledge, and go quiet.
    async fn handle_handoff(
        &self,
        tx: &mut SqliteConnection,
        lead: &Lead,
        msg: &InboundMessage,
        reason: &str,
    ) -> Result<HandlerReply, LeadgateError> {
        self.escalate(tx, lead, msg, reason).await?;
        Ok(HandlerReply::reply(
            self.templates.get(TemplateKey::QuestionReceived),
        ))
    }

    /// Move the lead under operator care and queue the notification.
    ///
    /// The transition is swallowed when invalid: the lead may already be in
    /// MANUAL_INTERVENTION.
    pub(super) async fn escalate(
        &self,
        tx: &mut SqliteConnection,
        lead: &Lead,
        msg: &InboundMessage,
        reason: &str,
    ) -> Result<(), LeadgateError> {
        match self
            .store
            .update_state(tx, &lead.lead_id, LeadState::ManualIntervention)
            .await
        {
            Ok(_) | Err(LeadgateError::InvalidTransition { .. }) => {}
            Err(e) => return Err(e),
        }

        self.store
            .enqueue_job(
                tx,
                QUEUE_OPERATOR_NOTIFY,
                &serde_json::json!({
                    "kind": NotificationKind::Escalation.as_str(),
                    "data": {
                        "user_id": msg.user_id,
                        "last_message": msg.text,
                        "current_state": lead.state.as_str(),
                        "warning_count": lead.warning_count,
                        "transport": msg.transport.as_str(),
                        "reason": reason,
                        "timestamp": Utc::now().to_rfc3339(),
                    },
                }),
                self.jobs_config.operator_notify_max_attempts,
            )
            .await?;

        info!("escalated {} ({reason})", msg.user_id);
        Ok(())
    }

    /// Queue a simple operator notification about this user.
    async fn notify(
        &self,
        tx: &mut SqliteConnection,
        kind: NotificationKind,
        msg: &InboundMessage,
    ) -> Result<(), LeadgateError> {
        self.store
            .enqueue_job(
                tx,
                QUEUE_OPERATOR_NOTIFY,
                &serde_json::json!({
                    "kind": kind.as_str(),
                    "data": {
                        "user_id": msg.user_id,
                        "push_name": msg.metadata.push_name,
                        "last_message": msg.text,
                        "transport": msg.transport.as_str(),
                    },
                }),
                self.jobs_config.operator_notify_max_attempts,
            )
            .await?;
        Ok(())
    }
}
