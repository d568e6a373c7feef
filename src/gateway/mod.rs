//! Gateway — the inbound message processing core.
//!
//! Composes the admission layer (dedup, cooldown, per-user mutex), the
//! lead store, the state machine, and the job outbox into one serialized
//! per-user flow: webhook in, at-most-once side effect out.

mod dispatch;
mod pipeline;

#[cfg(test)]
mod tests;

use leadgate_core::config::{Config, HandlerConfig, JobsConfig, MarkMode};
use leadgate_core::templates::ReplyTemplates;
use leadgate_kv::{CooldownStore, IdempotencyStore, Kv, UserLock};
use leadgate_store::Store;
use std::sync::Arc;
use std::time::Duration;

/// The central handler for inbound messages.
pub struct Gateway {
    pub(super) store: Store,
    pub(super) idempotency: IdempotencyStore,
    pub(super) lock: UserLock,
    pub(super) cooldown: CooldownStore,
    pub(super) templates: ReplyTemplates,
    pub(super) handler_config: HandlerConfig,
    pub(super) jobs_config: JobsConfig,
    pub(super) mark_mode: MarkMode,
}

impl Gateway {
    /// Wire the gateway from config, a store, and a KV backend.
    pub fn new(config: &Config, store: Store, kv: Arc<dyn Kv>, templates: ReplyTemplates) -> Self {
        Self {
            store,
            idempotency: IdempotencyStore::new(
                kv.clone(),
                Duration::from_secs(config.kv.idempotency_ttl_seconds),
            ),
            lock: UserLock::new(kv.clone(), Duration::from_secs(config.kv.lock_ttl_seconds)),
            cooldown: CooldownStore::new(
                kv,
                Duration::from_secs(config.kv.user_cooldown_seconds),
            ),
            templates,
            handler_config: config.handler.clone(),
            jobs_config: config.jobs.clone(),
            mark_mode: config.kv.mark_processed,
        }
    }

    /// The underlying store, shared with the job runner and health checks.
    pub fn store(&self) -> &Store {
        &self.store
    }
}
