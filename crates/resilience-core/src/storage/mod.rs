//! Storage layer - SQLite schema and connection lifecycle
//!
//! # Architecture
//!
//! - `schema`: Table, index and pragma definitions, applied idempotently
//! - `database`: Lazily-initialized connection pool that is only handed out
//!   once the schema is in place
//!
//! # Usage
//!
//! ```ignore
//! use resilience_core::storage::{Database, DatabaseConfig};
//!
//! // Create an in-memory database for testing
//! let db = Database::in_memory().await?;
//!
//! // Or point at the on-device file
//! let db = Database::new(DatabaseConfig::default());
//! let pool = db.acquire().await?;
//! ```

pub mod database;
pub mod schema;

// Re-export commonly used types
pub use database::{
    DATABASE_FILE_NAME, Database, DatabaseConfig, default_data_dir, default_database_path,
};
pub use schema::{INDEXES, SCHEMA_VERSION, SchemaStatus, TABLES, apply_schema, schema_status};
