//! Repository trait for habit persistence
//!
//! Abstracts the habit store so front ends do not depend on SQLite directly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

use super::habit::{Habit, HabitPatch, NewHabit};

/// Repository trait for habit persistence
#[async_trait]
pub trait HabitRepositoryTrait: Send + Sync {
    /// Insert a new habit and return its generated id
    async fn create(&self, input: NewHabit) -> Result<Uuid>;

    /// All habits, archived and active, in storage order
    async fn read_all(&self) -> Result<Vec<Habit>>;

    /// Archived habits only
    async fn read_archived(&self) -> Result<Vec<Habit>>;

    /// Get a habit by ID
    async fn get(&self, id: Uuid) -> Result<Option<Habit>>;

    /// Apply a partial update; an empty patch writes nothing
    async fn update(&self, id: Uuid, patch: HabitPatch) -> Result<()>;

    /// Mark a habit archived
    async fn archive(&self, id: Uuid) -> Result<()>;

    /// Mark a habit active again
    async fn unarchive(&self, id: Uuid) -> Result<()>;

    /// Physically delete an archived habit
    async fn delete(&self, id: Uuid) -> Result<()>;
}
