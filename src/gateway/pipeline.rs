//! The per-message processing pipeline.
//!
//! Admission (dedup, own-message bookkeeping, cooldown, per-user mutex),
//! then one outer transaction around identity resolution, interaction
//! logging, and the state dispatch. The mutex is released on every exit
//! path; the transaction rolls back on any error inside it.

use super::Gateway;
use leadgate_core::config::MarkMode;
use leadgate_core::error::LeadgateError;
use leadgate_core::intent::detect_intent;
use leadgate_core::message::{HandlerReply, InboundMessage};
use leadgate_core::state::LeadState;
use leadgate_store::{Direction, LeadOptions, NotificationKind, QUEUE_OPERATOR_NOTIFY};
use tracing::{debug, error, info, warn};

impl Gateway {
    /// Process a single inbound message and decide on a reply.
    ///
    /// Always returns a decision; failures surface as `success = false` and
    /// the webhook layer still answers HTTP 200.
    pub async fn handle_message(&self, msg: &InboundMessage) -> HandlerReply {
        // --- 1. IDEMPOTENCY ---
        // Mark before processing (default) to fence the transport's
        // `message` / `message.any` double delivery.
        if self.idempotency.seen(msg.transport, &msg.message_id).await {
            debug!("duplicate {} on {}, ignoring", msg.message_id, msg.transport);
            return HandlerReply::silent();
        }
        if self.mark_mode == MarkMode::Early {
            self.idempotency.mark(msg.transport, &msg.message_id).await;
        }

        let reply = match self.admit_and_process(msg).await {
            Ok(reply) => reply,
            Err(LeadgateError::LockFailed(user_id)) => {
                warn!("could not lock {user_id}, leaving message re-deliverable");
                if self.mark_mode == MarkMode::Early {
                    self.idempotency.unmark(msg.transport, &msg.message_id).await;
                }
                return HandlerReply::failed();
            }
            Err(e) => {
                error!("processing {} failed: {e}", msg.message_id);
                HandlerReply::failed()
            }
        };

        if self.mark_mode == MarkMode::PostCommit && reply.success {
            self.idempotency.mark(msg.transport, &msg.message_id).await;
        }

        // --- 6. POST-COMMIT COOLDOWN ---
        if reply.should_reply {
            self.cooldown.set_cooldown(&msg.user_id).await;
        }

        reply
    }

    /// Steps 2-5 and 7: own-message bookkeeping, cooldown, mutex,
    /// transactional processing.
    async fn admit_and_process(&self, msg: &InboundMessage) -> Result<HandlerReply, LeadgateError> {
        // --- 2. OUR OWN OUTBOUND MESSAGES ---
        // Someone we contacted first is not a bot-driven lead; record the
        // outbound text and keep quiet.
        if msg.from_me {
            let mut tx = self.store.begin().await?;
            let lead = self
                .store
                .mark_existing(&mut tx, &msg.user_id, msg.transport)
                .await?;
            if !msg.text.trim().is_empty() {
                self.store
                    .add_interaction(
                        &mut tx,
                        &lead.lead_id,
                        Some(&msg.message_id),
                        &msg.text,
                        Direction::Out,
                    )
                    .await?;
            }
            commit(tx).await?;
            return Ok(HandlerReply::silent());
        }

        // --- 3. COOLDOWN ---
        // The interaction is still persisted; only reply generation stops.
        if self.cooldown.in_cooldown(&msg.user_id).await {
            info!("cooldown active for {}, logging silently", msg.user_id);
            let mut tx = self.store.begin().await?;
            let (lead, _) = self
                .store
                .get_or_create(&mut tx, &msg.user_id, msg.transport, &lead_options(msg))
                .await?;
            self.store
                .add_interaction(
                    &mut tx,
                    &lead.lead_id,
                    Some(&msg.message_id),
                    &msg.text,
                    Direction::In,
                )
                .await?;
            commit(tx).await?;
            return Ok(HandlerReply::silent());
        }

        // --- 4. PER-USER MUTEX ---
        let token = self
            .lock
            .acquire_with_retry(&msg.user_id, self.handler_config.lock_max_attempts)
            .await?;

        // --- 5. TRANSACTIONAL PROCESSING ---
        let result = self.process_locked(msg).await;

        // --- 7. RELEASE, ON ALL PATHS ---
        self.lock.release(&msg.user_id, &token).await;

        result
    }

    /// One outer transaction: lead resolution, interaction log, dispatch.
    async fn process_locked(&self, msg: &InboundMessage) -> Result<HandlerReply, LeadgateError> {
        let mut tx = self.store.begin().await?;

        // a. Resolve or create the lead, refreshing observed metadata.
        let (mut lead, is_new) = self
            .store
            .get_or_create(&mut tx, &msg.user_id, msg.transport, &lead_options(msg))
            .await?;

        // b. Reconcile the alternate identifier when the transport sent one.
        if let Some(alt) = msg.metadata.alt_id.as_deref() {
            if let Some(resolved) = self.store.resolve_identity(&mut tx, &msg.user_id, alt).await? {
                lead = resolved;
            }
        }

        // c. Append the inbound interaction.
        self.store
            .add_interaction(
                &mut tx,
                &lead.lead_id,
                Some(&msg.message_id),
                &msg.text,
                Direction::In,
            )
            .await?;

        if is_new {
            self.store
                .enqueue_job(
                    &mut tx,
                    QUEUE_OPERATOR_NOTIFY,
                    &serde_json::json!({
                        "kind": NotificationKind::NewLead.as_str(),
                        "data": {
                            "user_id": msg.user_id,
                            "push_name": msg.metadata.push_name,
                            "transport": msg.transport.as_str(),
                        },
                    }),
                    self.jobs_config.operator_notify_max_attempts,
                )
                .await?;
        }

        let intent = detect_intent(&msg.text);
        debug!(
            "[{}] {} in {} (intent: {})",
            msg.transport,
            msg.user_id,
            lead.state,
            intent.as_str()
        );

        // d. Silent states: log and stop. FORM_COMPLETED and PARTNERSHIP
        // also stay out of the conversation, but they still get the one-time
        // operator handoff in dispatch.
        if !lead.state.reply_allowed()
            && !matches!(lead.state, LeadState::FormCompleted | LeadState::Partnership)
        {
            commit(tx).await?;
            return Ok(HandlerReply::silent());
        }

        // e. Dispatch by state.
        let reply = self.dispatch(&mut tx, &lead, msg).await?;

        commit(tx).await?;
        Ok(reply)
    }
}

fn lead_options(msg: &InboundMessage) -> LeadOptions {
    LeadOptions {
        push_name: msg.metadata.push_name.clone(),
        alt_id: msg.metadata.alt_id.clone(),
    }
}

async fn commit(tx: sqlx::Transaction<'_, sqlx::Sqlite>) -> Result<(), LeadgateError> {
    tx.commit()
        .await
        .map_err(|e| LeadgateError::Store(format!("commit failed: {e}")))
}
