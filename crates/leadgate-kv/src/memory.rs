//! In-process `Kv` implementation with expiry.
//!
//! Backs tests and single-node deployments (`kv.backend = "memory"`).
//! Not shared across processes; use Redis when scaling out.

use crate::Kv;
use async_trait::async_trait;
use leadgate_core::error::LeadgateError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Mutex-guarded map with lazy expiry.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Kv for MemoryKv {
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LeadgateError> {
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(Entry::live) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, LeadgateError> {
        let mut entries = self.entries.lock().await;
        let found = entries.get(key).map(|e| (e.live(), e.value.clone()));
        match found {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn compare_and_delete(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<bool, LeadgateError> {
        let mut entries = self.entries.lock().await;
        let matches = entries
            .get(key)
            .is_some_and(|e| e.live() && e.value == expected);
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn exists(&self, key: &str) -> Result<bool, LeadgateError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), LeadgateError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_if_absent() {
        let kv = MemoryKv::new();
        assert!(kv
            .set_if_absent_with_ttl("k", "a", Duration::from_secs(10))
            .await
            .unwrap());
        assert!(!kv
            .set_if_absent_with_ttl("k", "b", Duration::from_secs(10))
            .await
            .unwrap());
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_expiry() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k", "v", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(kv.exists("k").await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!kv.exists("k").await.unwrap());
        // Expired slot can be re-claimed by set-if-absent.
        assert!(kv
            .set_if_absent_with_ttl("k", "w", Duration::from_secs(10))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_delete() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k", "token-1", Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!kv.compare_and_delete("k", "token-2").await.unwrap());
        assert!(kv.exists("k").await.unwrap());

        assert!(kv.compare_and_delete("k", "token-1").await.unwrap());
        assert!(!kv.exists("k").await.unwrap());
        assert!(!kv.compare_and_delete("k", "token-1").await.unwrap());
    }
}
