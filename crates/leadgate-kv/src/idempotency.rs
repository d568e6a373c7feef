//! Message-level deduplication.

use crate::Kv;
use leadgate_core::message::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Records `(transport, message_id)` pairs already processed.
///
/// Degrades permissively: if the backing store is unreachable, `seen`
/// answers false and `mark` only logs. Under an outage we tolerate rare
/// duplicates rather than stall ingestion.
#[derive(Clone)]
pub struct IdempotencyStore {
    kv: Arc<dyn Kv>,
    ttl: Duration,
}

impl IdempotencyStore {
    pub fn new(kv: Arc<dyn Kv>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    fn key(transport: Transport, message_id: &str) -> String {
        format!("processed:{transport}:{message_id}")
    }

    /// Whether this message was already processed within the retention window.
    pub async fn seen(&self, transport: Transport, message_id: &str) -> bool {
        match self.kv.exists(&Self::key(transport, message_id)).await {
            Ok(seen) => seen,
            Err(e) => {
                warn!("idempotency check unavailable, proceeding: {e}");
                false
            }
        }
    }

    /// Record this message as processed.
    pub async fn mark(&self, transport: Transport, message_id: &str) {
        if let Err(e) = self
            .kv
            .set_with_ttl(&Self::key(transport, message_id), "1", self.ttl)
            .await
        {
            warn!("failed to mark {message_id} as processed: {e}");
        }
    }

    /// Best-effort removal of a processed marker.
    ///
    /// Used when admission fails before any side effect (e.g. the per-user
    /// mutex could not be taken), so the transport may redeliver.
    pub async fn unmark(&self, transport: Transport, message_id: &str) {
        if let Err(e) = self
            .kv
            .compare_and_delete(&Self::key(transport, message_id), "1")
            .await
        {
            warn!("failed to unmark {message_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryKv;

    #[tokio::test]
    async fn test_seen_after_mark() {
        let store = IdempotencyStore::new(Arc::new(MemoryKv::new()), Duration::from_secs(60));
        assert!(!store.seen(Transport::WhatsApp, "m1").await);

        store.mark(Transport::WhatsApp, "m1").await;
        assert!(store.seen(Transport::WhatsApp, "m1").await);
        // Same id on the other transport is a different message.
        assert!(!store.seen(Transport::Telegram, "m1").await);
    }

    #[tokio::test]
    async fn test_unmark_reopens_message() {
        let store = IdempotencyStore::new(Arc::new(MemoryKv::new()), Duration::from_secs(60));
        store.mark(Transport::WhatsApp, "m1").await;
        assert!(store.seen(Transport::WhatsApp, "m1").await);

        store.unmark(Transport::WhatsApp, "m1").await;
        assert!(!store.seen(Transport::WhatsApp, "m1").await);
    }

    #[tokio::test]
    async fn test_retention_expires() {
        let store = IdempotencyStore::new(Arc::new(MemoryKv::new()), Duration::from_millis(20));
        store.mark(Transport::WhatsApp, "m1").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!store.seen(Transport::WhatsApp, "m1").await);
    }
}
