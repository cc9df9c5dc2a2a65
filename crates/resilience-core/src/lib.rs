//! Resilience Core Library
//!
//! This crate provides the local persistence layer for Resilience:
//! - Storage (SQLite schema and connection lifecycle)
//! - Habits (entity mapping and repository)
//! - Configuration

pub mod config;
pub mod error;
pub mod habits;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::habits::{Habit, HabitPatch, HabitRepository, HabitType, NewHabit};
    pub use crate::storage::{Database, DatabaseConfig};
}
