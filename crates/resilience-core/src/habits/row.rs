//! Storage row shape for habits
//!
//! The only place where snake_case columns and integer booleans are turned
//! into the domain `Habit` and back.

use super::habit::{Habit, HabitType};
use crate::error::{Error, Result};
use uuid::Uuid;

/// Database row for a habit
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HabitRow {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    #[sqlx(rename = "type")]
    pub habit_type: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub archived: i64,
    pub synced: i64,
}

impl HabitRow {
    pub fn into_habit(self) -> Result<Habit> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::DataIntegrity(format!("Invalid habit ID '{}': {}", self.id, e)))?;
        let habit_type = HabitType::from_db(&self.habit_type).ok_or_else(|| {
            Error::DataIntegrity(format!("Invalid habit type: {}", self.habit_type))
        })?;
        let archived = bool_from_db("archived", self.archived)?;
        let synced = bool_from_db("synced", self.synced)?;

        Ok(Habit {
            id,
            user_id: self.user_id,
            name: self.name,
            habit_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
            archived,
            synced,
        })
    }

    pub fn from_habit(habit: &Habit) -> Self {
        Self {
            id: habit.id.to_string(),
            user_id: habit.user_id.clone(),
            name: habit.name.clone(),
            habit_type: habit.habit_type.as_str().to_string(),
            created_at: habit.created_at,
            updated_at: habit.updated_at,
            archived: bool_to_db(habit.archived),
            synced: bool_to_db(habit.synced),
        }
    }
}

/// Stored integer for a boolean flag
pub fn bool_to_db(value: bool) -> i64 {
    if value { 1 } else { 0 }
}

/// Boolean for a stored flag; only 0 and 1 are valid
pub fn bool_from_db(column: &str, value: i64) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::DataIntegrity(format!(
            "Column '{}' holds {}, expected 0 or 1",
            column, other
        ))),
    }
}
