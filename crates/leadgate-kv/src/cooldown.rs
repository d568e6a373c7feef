//! Post-reply cooldown per user.

use crate::Kv;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Suppresses further bot replies to a user shortly after one was issued.
///
/// Messages arriving during cooldown are still persisted as interactions;
/// only reply generation is skipped. Unreachable backing store means no
/// cooldown, not a stall.
#[derive(Clone)]
pub struct CooldownStore {
    kv: Arc<dyn Kv>,
    ttl: Duration,
}

impl CooldownStore {
    pub fn new(kv: Arc<dyn Kv>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    fn key(user_id: &str) -> String {
        format!("cooldown:user:{user_id}")
    }

    pub async fn in_cooldown(&self, user_id: &str) -> bool {
        match self.kv.exists(&Self::key(user_id)).await {
            Ok(active) => active,
            Err(e) => {
                warn!("cooldown check unavailable for {user_id}: {e}");
                false
            }
        }
    }

    pub async fn set_cooldown(&self, user_id: &str) {
        if let Err(e) = self.kv.set_with_ttl(&Self::key(user_id), "1", self.ttl).await {
            warn!("failed to set cooldown for {user_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryKv;

    #[tokio::test]
    async fn test_cooldown_window() {
        let store = CooldownStore::new(Arc::new(MemoryKv::new()), Duration::from_millis(30));
        assert!(!store.in_cooldown("u1").await);

        store.set_cooldown("u1").await;
        assert!(store.in_cooldown("u1").await);
        assert!(!store.in_cooldown("u2").await);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!store.in_cooldown("u1").await);
    }
}
