//! Database schema
//!
//! Defines the Resilience schema and applies it against a pool. Every
//! statement is guarded by `IF NOT EXISTS`, so applying the schema to an
//! already-initialized database changes nothing.

use crate::error::{Error, Result};
use sqlx::SqlitePool;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Tables created by the schema, in dependency order
pub const TABLES: [&str; 4] = ["habits", "habit_logs", "journal_entries", "resilience_metrics"];

/// Indexes created by the schema
pub const INDEXES: [&str; 4] = [
    "idx_habits_user_id",
    "idx_habit_logs_habit_id",
    "idx_journal_entries_created_at",
    "idx_resilience_metrics_date",
];

const PRAGMAS: &str = r#"
    PRAGMA foreign_keys = ON;
    PRAGMA journal_mode = WAL;
"#;

/// SQL for the schema version tracking table
const CREATE_VERSIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _schema_versions (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at INTEGER NOT NULL
    );
"#;

/// Schema v1: habits and the entities that will reference them
const SCHEMA_V1: &str = r#"
    -- Habits table
    CREATE TABLE IF NOT EXISTS habits (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT, -- null until cloud sync is enabled
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK (type IN ('build', 'quit')),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        archived INTEGER NOT NULL DEFAULT 0 CHECK (archived IN (0, 1)),
        synced INTEGER NOT NULL DEFAULT 0 CHECK (synced IN (0, 1)),
        CHECK (updated_at >= created_at)
    );

    -- Habit logs (one row per check-in)
    CREATE TABLE IF NOT EXISTS habit_logs (
        id TEXT PRIMARY KEY NOT NULL,
        habit_id TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
        timestamp INTEGER NOT NULL,
        emotion_tags TEXT NOT NULL, -- JSON array
        trigger_tags TEXT NOT NULL, -- JSON array
        note TEXT,
        synced INTEGER NOT NULL DEFAULT 0
    );

    -- Journal entries
    CREATE TABLE IF NOT EXISTS journal_entries (
        id TEXT PRIMARY KEY NOT NULL,
        content TEXT NOT NULL,
        sentiment_score REAL,
        emotion_tags TEXT NOT NULL, -- auto-detected emotions
        keywords TEXT NOT NULL, -- extracted keywords
        created_at INTEGER NOT NULL,
        synced INTEGER NOT NULL DEFAULT 0
    );

    -- Daily resilience metrics
    CREATE TABLE IF NOT EXISTS resilience_metrics (
        id TEXT PRIMARY KEY NOT NULL,
        date INTEGER NOT NULL,
        score REAL NOT NULL,
        consistency_factor REAL NOT NULL,
        recovery_factor REAL NOT NULL,
        reflection_factor REAL NOT NULL,
        synced INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_habits_user_id ON habits(user_id);
    CREATE INDEX IF NOT EXISTS idx_habit_logs_habit_id ON habit_logs(habit_id);
    CREATE INDEX IF NOT EXISTS idx_journal_entries_created_at ON journal_entries(created_at);
    CREATE INDEX IF NOT EXISTS idx_resilience_metrics_date ON resilience_metrics(date);
"#;

/// Apply pragmas and the full schema
///
/// Safe to call any number of times. Any failure is returned as
/// [`Error::Initialization`]; callers must not continue with a partially
/// created schema.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(PRAGMAS)
        .execute(pool)
        .await
        .map_err(|e| Error::Initialization(format!("Failed to set pragmas: {}", e)))?;

    sqlx::raw_sql(CREATE_VERSIONS_TABLE)
        .execute(pool)
        .await
        .map_err(|e| Error::Initialization(format!("Failed to create version table: {}", e)))?;

    let current_version = current_version(pool).await?;
    tracing::info!(
        current_version = current_version,
        target_version = SCHEMA_VERSION,
        "Applying database schema"
    );

    sqlx::raw_sql(SCHEMA_V1)
        .execute(pool)
        .await
        .map_err(|e| Error::Initialization(format!("Failed to apply schema v1: {}", e)))?;
    record_version(pool, 1).await?;

    tracing::debug!("Database schema is up to date");
    Ok(())
}

/// Highest schema version recorded in the database (0 when none)
pub async fn current_version(pool: &SqlitePool) -> Result<i32> {
    let (version,): (i32,) =
        sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _schema_versions")
            .fetch_one(pool)
            .await
            .map_err(|e| Error::Initialization(format!("Failed to read schema version: {}", e)))?;

    Ok(version)
}

async fn record_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO _schema_versions (version, applied_at) VALUES (?, ?)")
        .bind(version)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(pool)
        .await
        .map_err(|e| Error::Initialization(format!("Failed to record schema v{}: {}", version, e)))?;

    Ok(())
}

/// Get schema status information
///
/// Read-only: a database that has never had the schema applied reports
/// version 0 and is left untouched.
pub async fn schema_status(pool: &SqlitePool) -> Result<SchemaStatus> {
    let (tracked,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_schema_versions'",
    )
    .fetch_one(pool)
    .await?;

    let current_version = if tracked > 0 {
        current_version(pool).await?
    } else {
        0
    };
    Ok(SchemaStatus {
        current_version,
        target_version: SCHEMA_VERSION,
        needs_upgrade: current_version < SCHEMA_VERSION,
    })
}

/// Schema status information
#[derive(Debug, Clone)]
pub struct SchemaStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether the schema still has to be applied
    pub needs_upgrade: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool")
    }

    #[tokio::test]
    async fn test_apply_schema() {
        let pool = create_test_pool().await;

        let status = schema_status(&pool).await.unwrap();
        assert_eq!(status.current_version, 0);
        assert!(status.needs_upgrade);

        apply_schema(&pool).await.unwrap();

        let status = schema_status(&pool).await.unwrap();
        assert_eq!(status.current_version, SCHEMA_VERSION);
        assert!(!status.needs_upgrade);
    }

    #[tokio::test]
    async fn test_schema_status_does_not_write() {
        let pool = create_test_pool().await;

        let status = schema_status(&pool).await.unwrap();
        assert_eq!(status.current_version, 0);
        assert!(status.needs_upgrade);

        let (objects,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sqlite_master")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(objects, 0, "status check must not create any table");
    }

    #[tokio::test]
    async fn test_schema_idempotent() {
        let pool = create_test_pool().await;

        apply_schema(&pool).await.unwrap();
        apply_schema(&pool).await.unwrap();

        let (versions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _schema_versions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[tokio::test]
    async fn test_tables_created() {
        let pool = create_test_pool().await;
        apply_schema(&pool).await.unwrap();

        for table in TABLES {
            let result: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap_or_else(|_| panic!("Table {} should exist", table));
            assert_eq!(result.0, 0, "Table {} should be empty", table);
        }
    }

    #[tokio::test]
    async fn test_indexes_created() {
        let pool = create_test_pool().await;
        apply_schema(&pool).await.unwrap();

        for index in INDEXES {
            let found: Option<(String,)> =
                sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?")
                    .bind(index)
                    .fetch_optional(&pool)
                    .await
                    .unwrap();
            assert!(found.is_some(), "Index {} should exist", index);
        }
    }

    #[tokio::test]
    async fn test_foreign_keys_pragma_applied() {
        let pool = create_test_pool().await;
        apply_schema(&pool).await.unwrap();

        let (enabled,): (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_type_column_rejects_unknown_values() {
        let pool = create_test_pool().await;
        apply_schema(&pool).await.unwrap();

        let result = sqlx::query(
            "INSERT INTO habits (id, name, type, created_at, updated_at) VALUES ('h1', 'Walk', 'maybe', 1, 1)",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());

        let result = sqlx::query(
            "INSERT INTO habits (id, name, type, created_at, updated_at) VALUES ('h2', 'Walk', NULL, 1, 1)",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err(), "type must not be nullable");
    }
}
