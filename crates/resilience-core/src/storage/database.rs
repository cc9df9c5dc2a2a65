//! SQLite connection lifecycle
//!
//! Owns the single connection pool for the process. The pool is opened
//! lazily on the first [`Database::acquire`] and the schema is applied before
//! any caller sees it.

use crate::error::{Error, Result};
use crate::storage::schema;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Default maximum connections in the pool
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Name of the database file inside the data directory
pub const DATABASE_FILE_NAME: &str = "resilience.db";

const MEMORY_PATH: &str = ":memory:";

/// Database configuration options
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Journal mode (default: WAL so readers proceed during a write)
    pub journal_mode: SqliteJournalMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            journal_mode: SqliteJournalMode::Wal,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database config with the specified path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a config for an in-memory database (useful for testing)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            journal_mode: SqliteJournalMode::Wal,
        }
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }
}

/// Private application data directory
pub fn default_data_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("resilience"),
        None => PathBuf::from("."),
    }
}

/// Get the default database path
pub fn default_database_path() -> PathBuf {
    default_data_dir().join(DATABASE_FILE_NAME)
}

#[derive(Debug)]
struct Inner {
    config: DatabaseConfig,
    pool: Mutex<Option<SqlitePool>>,
    ready: AtomicBool,
}

/// Lazily-initialized database handle
///
/// Cloning is cheap and every clone shares the same pool. The first
/// `acquire` opens the pool and applies the schema; concurrent first callers
/// wait for the same initialization. A failed initialization is not cached,
/// and neither is a closed pool, so the next `acquire` after either starts
/// over.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// Create a handle for the given configuration without touching disk
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                pool: Mutex::new(None),
                ready: AtomicBool::new(false),
            }),
        }
    }

    /// Create a handle for the default on-device database file
    pub fn open_default() -> Self {
        Self::new(DatabaseConfig::default())
    }

    /// Create an in-memory database, already initialized (useful for testing)
    pub async fn in_memory() -> Result<Self> {
        let db = Self::new(DatabaseConfig::in_memory());
        db.acquire().await?;
        Ok(db)
    }

    /// Return a ready pool, opening it and applying the schema on first use
    pub async fn acquire(&self) -> Result<SqlitePool> {
        let mut slot = self.inner.pool.lock().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let pool = initialize(&self.inner.config).await?;
        *slot = Some(pool.clone());
        self.inner.ready.store(true, Ordering::Release);
        Ok(pool)
    }

    /// Whether an open pool is available without initializing
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Get the database configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.inner.config.path
    }

    /// Re-run the (idempotent) schema against the open pool
    pub async fn ensure_schema(&self) -> Result<()> {
        let pool = self.acquire().await?;
        schema::apply_schema(&pool).await
    }

    /// Check migration status
    pub async fn schema_status(&self) -> Result<schema::SchemaStatus> {
        let pool = self.acquire().await?;
        schema::schema_status(&pool).await
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        let pool = self.acquire().await?;
        sqlx::query("SELECT 1").fetch_one(&pool).await?;
        Ok(())
    }

    /// Close the pool if it is open
    ///
    /// The handle goes back to not ready. A later `acquire` opens a fresh
    /// pool; for an in-memory database that means an empty one.
    pub async fn close(&self) {
        let pool = {
            let mut slot = self.inner.pool.lock().await;
            self.inner.ready.store(false, Ordering::Release);
            slot.take()
        };
        if let Some(pool) = pool {
            pool.close().await;
            tracing::debug!(path = %self.inner.config.path.display(), "Database closed");
        }
    }
}

async fn initialize(config: &DatabaseConfig) -> Result<SqlitePool> {
    let connection_str = if config.is_memory() {
        "sqlite::memory:".to_string()
    } else {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Initialization(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        format!("sqlite:{}", config.path.display())
    };

    let connect_options = SqliteConnectOptions::from_str(&connection_str)
        .map_err(|e| Error::Initialization(format!("Invalid database path: {}", e)))?
        .journal_mode(config.journal_mode)
        .foreign_keys(true)
        .create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.is_memory() {
        // The in-memory database lives only as long as its connection
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            Error::Initialization(format!(
                "Failed to connect to database {}: {}",
                config.path.display(),
                e
            ))
        })?;

    schema::apply_schema(&pool).await?;

    tracing::info!(path = %config.path.display(), "Database ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::in_memory().await.expect("Failed to create in-memory database");

        assert!(db.is_ready());
        db.health_check().await.expect("Health check failed");

        let status = db.schema_status().await.expect("Failed to get schema status");
        assert!(!status.needs_upgrade);
    }

    #[tokio::test]
    async fn test_database_config_builder() {
        let config = DatabaseConfig::with_path("/tmp/test.db").max_connections(10);

        assert_eq!(config.path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.max_connections, 10);
        assert!(matches!(config.journal_mode, SqliteJournalMode::Wal));
        assert!(!config.is_memory());
        assert!(DatabaseConfig::in_memory().is_memory());
    }

    #[test]
    fn test_default_path_uses_fixed_file_name() {
        let path = default_database_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(DATABASE_FILE_NAME)
        );
    }

    #[tokio::test]
    async fn test_new_is_lazy() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join(DATABASE_FILE_NAME);
        let db = Database::new(DatabaseConfig::with_path(&db_path));

        assert!(!db.is_ready());
        assert!(!db_path.exists());

        db.acquire().await.expect("Failed to acquire");
        assert!(db.is_ready());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_acquire_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(DatabaseConfig::with_path(
            temp_dir.path().join(DATABASE_FILE_NAME),
        ));

        let first = db.acquire().await.expect("first acquire");
        sqlx::query("INSERT INTO habits (id, name, type, created_at, updated_at) VALUES ('h1', 'Read', 'build', 1, 1)")
            .execute(&first)
            .await
            .unwrap();

        db.ensure_schema().await.expect("schema re-apply should succeed");

        let second = db.acquire().await.expect("second acquire");
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM habits")
            .fetch_one(&second)
            .await
            .unwrap();
        assert_eq!(count, 1, "re-acquire and re-apply must keep existing rows");

        let (versions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _schema_versions")
            .fetch_one(&second)
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[tokio::test]
    async fn test_close_resets_readiness() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(DatabaseConfig::with_path(
            temp_dir.path().join(DATABASE_FILE_NAME),
        ));
        let clone = db.clone();

        let pool = db.acquire().await.unwrap();
        sqlx::query("INSERT INTO habits (id, name, type, created_at, updated_at) VALUES ('h1', 'Read', 'build', 1, 1)")
            .execute(&pool)
            .await
            .unwrap();

        db.close().await;
        assert!(!db.is_ready());
        assert!(!clone.is_ready());
        assert!(pool.is_closed());

        // Closing twice is harmless
        db.close().await;

        let reopened = clone.acquire().await.expect("acquire after close reopens");
        assert!(db.is_ready());
        assert!(!reopened.is_closed());
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM habits")
            .fetch_one(&reopened)
            .await
            .unwrap();
        assert_eq!(count, 1);
        db.health_check().await.expect("health check after reopen");
    }

    #[tokio::test]
    async fn test_in_memory_pool_keeps_its_connection() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.acquire().await.unwrap();

        assert_eq!(pool.options().get_min_connections(), 1);
        assert!(pool.options().get_idle_timeout().is_none());
        assert!(pool.options().get_max_lifetime().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_pool() {
        let db = Database::in_memory().await.unwrap();
        let clone = db.clone();

        assert!(clone.is_ready());
        sqlx::query("INSERT INTO habits (id, name, type, created_at, updated_at) VALUES ('h1', 'Read', 'build', 1, 1)")
            .execute(&db.acquire().await.unwrap())
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM habits")
            .fetch_one(&clone.acquire().await.unwrap())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_acquire() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(DatabaseConfig::with_path(
            temp_dir.path().join(DATABASE_FILE_NAME),
        ));

        let (a, b) = tokio::join!(db.acquire(), db.acquire());
        assert!(a.is_ok());
        assert!(b.is_ok());

        let (versions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _schema_versions")
            .fetch_one(&db.acquire().await.unwrap())
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::in_memory().await.expect("Failed to create database");

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&db.acquire().await.unwrap())
            .await
            .expect("Failed to check foreign_keys pragma");

        assert_eq!(result.0, 1, "Foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_file_database_uses_wal() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(DatabaseConfig::with_path(
            temp_dir.path().join(DATABASE_FILE_NAME),
        ));

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&db.acquire().await.unwrap())
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_open_failure_is_initialization_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the database file should be cannot be opened
        let db = Database::new(DatabaseConfig::with_path(temp_dir.path()));

        let err = db.acquire().await.unwrap_err();
        assert_eq!(err.code(), "E001");
        assert!(!db.is_ready());
    }
}
