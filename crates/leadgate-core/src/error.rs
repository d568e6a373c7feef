use crate::state::LeadState;
use thiserror::Error;

/// Top-level error type for leadgate.
#[derive(Debug, Error)]
pub enum LeadgateError {
    /// Error from a messaging transport.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Relational store error.
    #[error("store error: {0}")]
    Store(String),

    /// Shared key-value service error (dedup/lock/cooldown).
    #[error("kv error: {0}")]
    Kv(String),

    /// Job outbox error.
    #[error("queue error: {0}")]
    Queue(String),

    /// A state transition not present in the transition table.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: LeadState, to: LeadState },

    /// Per-user mutex could not be acquired within the retry budget.
    #[error("lock acquisition failed for {0}")]
    LockFailed(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
