//! Habit domain module
//!
//! # Architecture
//!
//! - **Entities**: `Habit`, `HabitType`, `NewHabit`, `HabitPatch`
//! - **Mapping**: `HabitRow`, the storage row shape with integer booleans
//! - **Repository**: `HabitRepository` for database operations
//!
//! # Lifecycle
//!
//! A habit is created active and unsynced. `update`, `archive` and
//! `unarchive` bump `updated_at` and reset `synced`. Only an archived habit
//! can be deleted; deletion removes its habit logs as well.
//!
//! # Example
//!
//! ```ignore
//! use resilience_core::habits::{HabitPatch, HabitRepository, HabitType, NewHabit};
//! use resilience_core::storage::Database;
//!
//! let repo = HabitRepository::new(Database::open_default());
//!
//! let id = repo.create(NewHabit::new("Morning walk", HabitType::Build)).await?;
//! repo.update(id, HabitPatch::name("Evening walk")).await?;
//! repo.archive(id).await?;
//! repo.delete(id).await?;
//! ```

pub mod habit;
pub mod repository;
pub mod repository_trait;
pub mod row;

// Re-export main types
pub use habit::{Habit, HabitOperation, HabitPatch, HabitType, MissingRowPolicy, NewHabit, PatchColumn};
pub use repository::HabitRepository;
pub use repository_trait::HabitRepositoryTrait;
pub use row::HabitRow;
