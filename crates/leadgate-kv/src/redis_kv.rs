//! Redis-backed `Kv` implementation.

use crate::Kv;
use async_trait::async_trait;
use leadgate_core::error::LeadgateError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Compare-and-delete as a single server-side operation, so an expired lock
/// reacquired by another worker cannot be released by the original holder.
const CAD_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Shared Redis connection for the admission layer.
#[derive(Clone)]
pub struct RedisKv {
    manager: ConnectionManager,
}

impl RedisKv {
    /// Connect to Redis; the connection manager reconnects on failure.
    pub async fn connect(url: &str) -> Result<Self, LeadgateError> {
        let client = redis::Client::open(url)
            .map_err(|e| LeadgateError::Kv(format!("invalid redis url {url}: {e}")))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| LeadgateError::Kv(format!("failed to connect to redis: {e}")))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl Kv for RedisKv {
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LeadgateError> {
        let mut conn = self.manager.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| LeadgateError::Kv(format!("SET NX {key} failed: {e}")))?;
        Ok(set.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, LeadgateError> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|e| LeadgateError::Kv(format!("GET {key} failed: {e}")))
    }

    async fn compare_and_delete(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<bool, LeadgateError> {
        let mut conn = self.manager.clone();
        let deleted: i64 = redis::Script::new(CAD_SCRIPT)
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LeadgateError::Kv(format!("compare-and-delete {key} failed: {e}")))?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, LeadgateError> {
        let mut conn = self.manager.clone();
        conn.exists(key)
            .await
            .map_err(|e| LeadgateError::Kv(format!("EXISTS {key} failed: {e}")))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), LeadgateError> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| LeadgateError::Kv(format!("SETEX {key} failed: {e}")))
    }
}
