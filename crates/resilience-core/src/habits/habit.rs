//! Habit entity and related types
//!
//! Defines the domain `Habit`, its polarity, the creation input, and the
//! partial-update patch.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Semantic polarity of a habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitType {
    /// A behavior the user wants to build
    Build,
    /// A behavior the user wants to quit
    Quit,
}

impl HabitType {
    /// Cast a stored column value; the column constraint guarantees a match
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "build" => Some(Self::Build),
            "quit" => Some(Self::Quit),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Quit => "quit",
        }
    }
}

impl fmt::Display for HabitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HabitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_db(&s.trim().to_lowercase()).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Unknown habit type '{}'. Expected 'build' or 'quit'.",
                s
            ))
        })
    }
}

/// A tracked habit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Unique habit identifier
    pub id: Uuid,

    /// Cloud account owning the habit; `None` until sync is enabled
    pub user_id: Option<String>,

    /// Display name
    pub name: String,

    /// Build or quit
    #[serde(rename = "type")]
    pub habit_type: HabitType,

    /// Creation time, milliseconds since the Unix epoch
    pub created_at: i64,

    /// Last mutation time, milliseconds since the Unix epoch
    pub updated_at: i64,

    /// Soft-delete flag
    pub archived: bool,

    /// Reserved for cloud sync; reset on every local mutation
    pub synced: bool,
}

impl Habit {
    /// Build a fresh, unarchived and unsynced habit
    pub fn new(input: NewHabit, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            name: input.name,
            habit_type: input.habit_type,
            created_at: now_ms,
            updated_at: now_ms,
            archived: false,
            synced: false,
        }
    }

    /// Whether the habit is still active (not archived)
    pub fn is_active(&self) -> bool {
        !self.archived
    }

    /// Whether the habit may be physically deleted
    pub fn is_deletable(&self) -> bool {
        self.archived
    }

    /// Creation time as a UTC timestamp
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }

    /// Last mutation time as a UTC timestamp
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.updated_at)
    }
}

/// Input for creating a habit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub name: String,
    #[serde(rename = "type")]
    pub habit_type: HabitType,
    pub user_id: Option<String>,
}

impl NewHabit {
    /// Create input for a habit not yet tied to a cloud account
    pub fn new(name: impl Into<String>, habit_type: HabitType) -> Self {
        Self {
            name: name.into(),
            habit_type,
            user_id: None,
        }
    }

    /// Attach a cloud account id
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Reject blank names
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }
}

/// Partial update for a habit; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub habit_type: Option<HabitType>,
}

/// A single column assignment produced from a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchColumn {
    Name(String),
    Type(HabitType),
}

impl PatchColumn {
    /// Column this assignment writes
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Type(_) => "type",
        }
    }
}

impl HabitPatch {
    /// Patch that only renames
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            habit_type: None,
        }
    }

    /// Patch that only changes the type
    pub fn habit_type(habit_type: HabitType) -> Self {
        Self {
            name: None,
            habit_type: Some(habit_type),
        }
    }

    /// True when the patch carries no field changes
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.habit_type.is_none()
    }

    /// Minimal set of content columns to write, in a stable order
    pub fn assignments(&self) -> Vec<PatchColumn> {
        let mut columns = Vec::with_capacity(2);
        if let Some(name) = &self.name {
            columns.push(PatchColumn::Name(name.clone()));
        }
        if let Some(habit_type) = self.habit_type {
            columns.push(PatchColumn::Type(habit_type));
        }
        columns
    }

    /// Reject a supplied but blank name
    pub fn validate(&self) -> Result<()> {
        match &self.name {
            Some(name) => validate_name(name),
            None => Ok(()),
        }
    }
}

/// Repository operations that target an existing row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HabitOperation {
    Update,
    Archive,
    Unarchive,
    Delete,
}

/// What an operation does when its statement matched no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRowPolicy {
    /// Complete without error and without effect
    Ignore,
    /// Fail with a precondition error
    Fail,
}

impl HabitOperation {
    pub fn missing_row_policy(&self) -> MissingRowPolicy {
        match self {
            Self::Update | Self::Archive | Self::Unarchive => MissingRowPolicy::Ignore,
            Self::Delete => MissingRowPolicy::Fail,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Archive => "archive",
            Self::Unarchive => "unarchive",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for HabitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("Habit name cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_habit_type_parsing() {
        assert_eq!("build".parse::<HabitType>().unwrap(), HabitType::Build);
        assert_eq!(" Quit ".parse::<HabitType>().unwrap(), HabitType::Quit);
        assert!("maybe".parse::<HabitType>().is_err());

        // The stored form is exact
        assert_eq!(HabitType::from_db("quit"), Some(HabitType::Quit));
        assert_eq!(HabitType::from_db("Quit"), None);
    }

    #[test]
    fn test_new_habit_defaults() {
        let habit = Habit::new(NewHabit::new("Meditate", HabitType::Build), 1_700_000_000_000);

        assert_eq!(habit.created_at, habit.updated_at);
        assert!(!habit.archived);
        assert!(!habit.synced);
        assert!(habit.user_id.is_none());
        assert!(habit.is_active());
        assert!(!habit.is_deletable());
        assert!(habit.created_at_utc().is_some());
    }

    #[test]
    fn test_empty_patch_has_no_assignments() {
        let patch = HabitPatch::default();
        assert!(patch.is_empty());
        assert!(patch.assignments().is_empty());
    }

    #[test]
    fn test_patch_assignments_are_minimal() {
        let patch = HabitPatch::name("Run");
        assert_eq!(patch.assignments(), vec![PatchColumn::Name("Run".to_string())]);

        let patch = HabitPatch::habit_type(HabitType::Quit);
        let columns: Vec<_> = patch.assignments().iter().map(PatchColumn::column).collect();
        assert_eq!(columns, vec!["type"]);

        let patch = HabitPatch {
            name: Some("Run".to_string()),
            habit_type: Some(HabitType::Quit),
        };
        let columns: Vec<_> = patch.assignments().iter().map(PatchColumn::column).collect();
        assert_eq!(columns, vec!["name", "type"]);
    }

    #[test]
    fn test_name_validation() {
        assert!(NewHabit::new("  ", HabitType::Build).validate().is_err());
        assert!(NewHabit::new("Walk", HabitType::Build).validate().is_ok());
        assert!(HabitPatch::name("").validate().is_err());
        assert!(HabitPatch::habit_type(HabitType::Quit).validate().is_ok());
    }

    #[test]
    fn test_missing_row_policies() {
        assert_eq!(HabitOperation::Update.missing_row_policy(), MissingRowPolicy::Ignore);
        assert_eq!(HabitOperation::Archive.missing_row_policy(), MissingRowPolicy::Ignore);
        assert_eq!(HabitOperation::Unarchive.missing_row_policy(), MissingRowPolicy::Ignore);
        assert_eq!(HabitOperation::Delete.missing_row_policy(), MissingRowPolicy::Fail);
    }

    #[test]
    fn test_habit_serializes_camel_case() {
        let habit = Habit::new(NewHabit::new("Journal", HabitType::Quit).with_user("u1"), 42);
        let json = serde_json::to_value(&habit).unwrap();

        assert_eq!(json["userId"], "u1");
        assert_eq!(json["type"], "quit");
        assert_eq!(json["createdAt"], 42);
        assert_eq!(json["updatedAt"], 42);
        assert_eq!(json["archived"], false);
        assert_eq!(json["synced"], false);
    }
}
