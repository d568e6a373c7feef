//! Per-user mutex with fencing tokens.

use crate::Kv;
use leadgate_core::error::LeadgateError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Distributed lock keyed by user id.
///
/// Each acquisition mints a fresh UUID token; release is a token-guarded
/// compare-and-delete, so a lock that expired and was reacquired by another
/// worker cannot be released by the original holder. TTL bounds the hold
/// time of a crashed worker.
#[derive(Clone)]
pub struct UserLock {
    kv: Arc<dyn Kv>,
    ttl: Duration,
}

impl UserLock {
    pub fn new(kv: Arc<dyn Kv>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    fn key(user_id: &str) -> String {
        format!("lock:user:{user_id}")
    }

    /// Try once to take the lock. Returns the fencing token on success.
    ///
    /// If the backing store is unreachable the lock degrades to best-effort:
    /// processing proceeds unserialized rather than stalling.
    pub async fn acquire(&self, user_id: &str) -> Option<String> {
        let token = Uuid::new_v4().to_string();
        match self
            .kv
            .set_if_absent_with_ttl(&Self::key(user_id), &token, self.ttl)
            .await
        {
            Ok(true) => Some(token),
            Ok(false) => None,
            Err(e) => {
                warn!("lock store unavailable for {user_id}, proceeding unlocked: {e}");
                Some(token)
            }
        }
    }

    /// Take the lock with up to `max_attempts` tries and linearly growing
    /// backoff (100 ms x attempt).
    pub async fn acquire_with_retry(
        &self,
        user_id: &str,
        max_attempts: u32,
    ) -> Result<String, LeadgateError> {
        for attempt in 1..=max_attempts {
            if let Some(token) = self.acquire(user_id).await {
                return Ok(token);
            }
            if attempt < max_attempts {
                tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
            }
        }
        Err(LeadgateError::LockFailed(user_id.to_string()))
    }

    /// Release the lock iff we still hold it.
    pub async fn release(&self, user_id: &str, token: &str) {
        match self.kv.compare_and_delete(&Self::key(user_id), token).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("lock for {user_id} already expired or taken over");
            }
            Err(e) => {
                warn!("failed to release lock for {user_id}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryKv;

    fn lock_with_ttl(ttl: Duration) -> UserLock {
        UserLock::new(Arc::new(MemoryKv::new()), ttl)
    }

    #[tokio::test]
    async fn test_mutual_exclusion() {
        let lock = lock_with_ttl(Duration::from_secs(10));
        let token = lock.acquire("u1").await.unwrap();
        assert!(lock.acquire("u1").await.is_none());
        // A different user is unaffected.
        assert!(lock.acquire("u2").await.is_some());

        lock.release("u1", &token).await;
        assert!(lock.acquire("u1").await.is_some());
    }

    #[tokio::test]
    async fn test_stale_token_cannot_release_reacquired_lock() {
        let lock = lock_with_ttl(Duration::from_millis(20));
        let stale = lock.acquire("u1").await.unwrap();

        // Lock expires, another worker takes it.
        tokio::time::sleep(Duration::from_millis(40)).await;
        let fresh = lock.acquire("u1").await.unwrap();

        // The original holder's release must not free the new holder's lock.
        lock.release("u1", &stale).await;
        assert!(lock.acquire("u1").await.is_none());

        lock.release("u1", &fresh).await;
        assert!(lock.acquire("u1").await.is_some());
    }

    #[tokio::test]
    async fn test_acquire_with_retry_exhaustion() {
        let lock = lock_with_ttl(Duration::from_secs(10));
        let _held = lock.acquire("u1").await.unwrap();

        let err = lock.acquire_with_retry("u1", 2).await.unwrap_err();
        assert!(matches!(err, LeadgateError::LockFailed(_)));
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let lock = lock_with_ttl(Duration::from_secs(10));
        let t1 = lock.acquire("u1").await.unwrap();
        let t2 = lock.acquire("u2").await.unwrap();
        assert_ne!(t1, t2);
    }
}
