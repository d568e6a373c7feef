//! SQLite-backed persistent store.
//!
//! Split into focused submodules:
//! - `leads` — lead lifecycle, state transitions, warning counter
//! - `interactions` — append-only message log
//! - `forms` — form fragment accumulation
//! - `identity` — primary/alternate identifier reconciliation
//! - `jobs` — transactional outbox with retry accounting
//!
//! Mutating operations take a `&mut SqliteConnection` so the handler can
//! compose them into one outer transaction per inbound message.

mod forms;
mod identity;
mod interactions;
mod jobs;
mod leads;

pub use forms::FormRecord;
pub use interactions::Direction;
pub use jobs::{Job, NotificationKind, QUEUE_OPERATOR_NOTIFY, QUEUE_SPREADSHEET_SYNC};
pub use leads::{Lead, LeadOptions};

use leadgate_core::config::StoreConfig;
use leadgate_core::error::LeadgateError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqlitePool, Transaction};
use std::str::FromStr;
use tracing::info;

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a new store, running migrations on first use.
    pub async fn new(config: &StoreConfig) -> Result<Self, LeadgateError> {
        let in_memory = config.db_path == ":memory:";

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
            if !in_memory && !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LeadgateError::Store(format!("failed to create data dir: {e}"))
                })?;
            }
        }

        let mut opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.db_path))
            .map_err(|e| LeadgateError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            opts = opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
        }

        // An in-memory database exists per connection, so it gets exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect_with(opts)
            .await
            .map_err(|e| LeadgateError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("lead store initialized at {}", config.db_path);

        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open the outer transaction for one inbound message.
    pub async fn begin(&self) -> Result<Transaction<'_, sqlx::Sqlite>, LeadgateError> {
        self.pool
            .begin()
            .await
            .map_err(|e| LeadgateError::Store(format!("failed to begin transaction: {e}")))
    }

    /// Run SQL migrations, tracking which have already been applied.
    pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), LeadgateError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| LeadgateError::Store(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            ("001_init", include_str!("../../migrations/001_init.sql")),
            ("002_jobs", include_str!("../../migrations/002_jobs.sql")),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        LeadgateError::Store(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| LeadgateError::Store(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    LeadgateError::Store(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}
