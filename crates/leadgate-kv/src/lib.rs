//! # leadgate-kv
//!
//! The shared key-value admission layer: idempotency, per-user mutex, and
//! cooldown, all built over one small `Kv` trait. A Redis backend makes
//! horizontal scaling a configuration change; the in-process backend serves
//! tests and single-node deployments.

mod cooldown;
mod idempotency;
mod lock;
mod memory;
mod redis_kv;

pub use cooldown::CooldownStore;
pub use idempotency::IdempotencyStore;
pub use lock::UserLock;
pub use memory::MemoryKv;
pub use redis_kv::RedisKv;

use async_trait::async_trait;
use leadgate_core::error::LeadgateError;
use std::time::Duration;

/// Minimal key-value operations the admission layer needs.
///
/// All TTLs are mandatory: nothing in this layer lives forever.
#[async_trait]
pub trait Kv: Send + Sync {
    /// Atomically set `key` to `value` iff absent, with expiry.
    /// Returns true when the key was set.
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LeadgateError>;

    /// Read a key.
    async fn get(&self, key: &str) -> Result<Option<String>, LeadgateError>;

    /// Delete `key` only if its current value equals `expected`, atomically.
    /// Returns true when the key was deleted.
    async fn compare_and_delete(&self, key: &str, expected: &str)
        -> Result<bool, LeadgateError>;

    /// Whether a key currently exists.
    async fn exists(&self, key: &str) -> Result<bool, LeadgateError>;

    /// Set a key unconditionally, with expiry.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), LeadgateError>;
}
