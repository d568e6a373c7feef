mod channels;
mod defaults;

#[cfg(test)]
mod tests;

pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::LeadgateError;
use defaults::*;

/// Top-level leadgate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub kv: KvConfig,
    #[serde(default)]
    pub handler: HandlerConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Webhook HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path prefix for webhook routes (e.g. `/hooks`). Empty = root.
    #[serde(default)]
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_path: String::new(),
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// When to mark a message as processed relative to the outer transaction.
///
/// `Early` (the default) fences duplicate webhook storms at the cost of one
/// lost reply when the transaction later fails. `PostCommit` never loses a
/// reply but leaves a narrow duplicate-processing window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkMode {
    #[default]
    Early,
    PostCommit,
}

/// Shared key-value admission layer settings (dedup, lock, cooldown).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    /// `redis` for a shared store, `memory` for single-node deployments.
    #[serde(default = "default_kv_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
    #[serde(default = "default_cooldown_ttl")]
    pub user_cooldown_seconds: u64,
    #[serde(default = "default_idempotency_ttl")]
    pub idempotency_ttl_seconds: u64,
    #[serde(default)]
    pub mark_processed: MarkMode,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            backend: default_kv_backend(),
            redis_url: default_redis_url(),
            lock_ttl_seconds: default_lock_ttl(),
            user_cooldown_seconds: default_cooldown_ttl(),
            idempotency_ttl_seconds: default_idempotency_ttl(),
            mark_processed: MarkMode::default(),
        }
    }
}

/// Handler pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Invalid attempts tolerated before escalation to an operator.
    #[serde(default = "default_max_warnings")]
    pub max_warnings: i64,
    /// Per-user mutex acquisition attempts.
    #[serde(default = "default_lock_attempts")]
    pub lock_max_attempts: u32,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_warnings: default_max_warnings(),
            lock_max_attempts: default_lock_attempts(),
        }
    }
}

/// Outbox job runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_job_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_spreadsheet_attempts")]
    pub spreadsheet_sync_max_attempts: u32,
    #[serde(default = "default_notify_attempts")]
    pub operator_notify_max_attempts: u32,
    /// Endpoint that receives completed form payloads (e.g. an Apps Script URL).
    #[serde(default)]
    pub spreadsheet_webhook_url: String,
    /// Telegram chat that receives operator notifications.
    #[serde(default)]
    pub operator_chat_id: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_job_poll_interval(),
            spreadsheet_sync_max_attempts: default_spreadsheet_attempts(),
            operator_notify_max_attempts: default_notify_attempts(),
            spreadsheet_webhook_url: String::new(),
            operator_chat_id: String::new(),
        }
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, LeadgateError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!("config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| LeadgateError::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| LeadgateError::Config(format!("failed to parse config: {e}")))?;

    Ok(config)
}
