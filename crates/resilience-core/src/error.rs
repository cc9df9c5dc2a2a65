//! Error types for Resilience

use thiserror::Error;

/// Result type alias using Resilience's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Resilience error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Lifecycle errors (E001-E099)
    #[error("Database initialization failed: {0}")]
    Initialization(String),

    // Storage errors (E100-E199)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    // Business rule errors (E200-E299)
    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),

    // Input errors (E300-E399)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Config errors (E400-E499)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Initialization(_) => "E001",
            Self::Database(_) => "E100",
            Self::DataIntegrity(_) => "E101",
            Self::PreconditionNotMet(_) => "E200",
            Self::InvalidInput(_) => "E300",
            Self::Config(_) => "E400",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Initialization(_) => {
                Some("Check that the data directory is writable".to_string())
            }
            Self::PreconditionNotMet(_) => {
                Some("Archive the habit with `resilience archive <ID>` before deleting it".to_string())
            }
            Self::Config(_) => Some("resilience config list".to_string()),
            _ => None,
        }
    }

    /// Whether this error is the repository's delete guard
    pub fn is_precondition_not_met(&self) -> bool {
        matches!(self, Self::PreconditionNotMet(_))
    }

    /// Whether this error came from a violated SQLite constraint (CHECK, FOREIGN KEY, ...)
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => matches!(
                db.kind(),
                sqlx::error::ErrorKind::CheckViolation
                    | sqlx::error::ErrorKind::ForeignKeyViolation
                    | sqlx::error::ErrorKind::NotNullViolation
                    | sqlx::error::ErrorKind::UniqueViolation
            ),
            _ => false,
        }
    }
}
