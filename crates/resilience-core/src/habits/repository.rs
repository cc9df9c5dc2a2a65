//! Habit repository for database operations
//!
//! Every operation acquires a ready pool from [`Database`] first, so callers
//! never see a database whose schema has not been applied.

use super::habit::{Habit, HabitOperation, HabitPatch, MissingRowPolicy, NewHabit, PatchColumn};
use super::repository_trait::HabitRepositoryTrait;
use super::row::{HabitRow, bool_to_db};
use crate::error::{Error, Result};
use crate::storage::Database;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

const SELECT_HABITS: &str = r#"
    SELECT id, user_id, name, type, created_at, updated_at, archived, synced
    FROM habits
"#;

/// Repository for habit database operations
#[derive(Debug, Clone)]
pub struct HabitRepository {
    db: Database,
}

impl HabitRepository {
    /// Create a new repository on top of the given database handle
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Insert a new habit and return its generated id
    ///
    /// The row starts unarchived and unsynced with `updated_at = created_at`.
    /// Duplicate names are allowed.
    pub async fn create(&self, input: NewHabit) -> Result<Uuid> {
        input.validate()?;
        let pool = self.db.acquire().await?;

        let habit = Habit::new(input, now_millis());
        let row = HabitRow::from_habit(&habit);

        sqlx::query(
            r#"
            INSERT INTO habits (
                id, user_id, name, type,
                created_at, updated_at, archived, synced
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.name)
        .bind(&row.habit_type)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.archived)
        .bind(row.synced)
        .execute(&pool)
        .await
        .map_err(Error::Database)?;

        tracing::debug!(habit_id = %habit.id, habit_type = %habit.habit_type, "Created habit");
        Ok(habit.id)
    }

    /// All habits, archived and active, in storage order
    pub async fn read_all(&self) -> Result<Vec<Habit>> {
        let pool = self.db.acquire().await?;

        let rows: Vec<HabitRow> = sqlx::query_as(&format!("{} ORDER BY rowid", SELECT_HABITS))
            .fetch_all(&pool)
            .await
            .map_err(Error::Database)?;

        rows.into_iter().map(HabitRow::into_habit).collect()
    }

    /// Archived habits only, in storage order
    pub async fn read_archived(&self) -> Result<Vec<Habit>> {
        let pool = self.db.acquire().await?;

        let rows: Vec<HabitRow> = sqlx::query_as(&format!(
            "{} WHERE archived = 1 ORDER BY rowid",
            SELECT_HABITS
        ))
        .fetch_all(&pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(HabitRow::into_habit).collect()
    }

    /// Get a habit by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Habit>> {
        let pool = self.db.acquire().await?;

        let row: Option<HabitRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_HABITS))
            .bind(id.to_string())
            .fetch_optional(&pool)
            .await
            .map_err(Error::Database)?;

        row.map(HabitRow::into_habit).transpose()
    }

    /// Apply a partial update
    ///
    /// Only the supplied fields are written, together with `updated_at` and
    /// the sync reset. An empty patch issues no statement at all, and an
    /// unknown id completes without effect.
    pub async fn update(&self, id: Uuid, patch: HabitPatch) -> Result<()> {
        let assignments = patch.assignments();
        if assignments.is_empty() {
            tracing::debug!(habit_id = %id, "Empty habit patch, skipping write");
            return Ok(());
        }
        patch.validate()?;

        let pool = self.db.acquire().await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE habits SET ");
        let mut set = builder.separated(", ");
        for assignment in assignments {
            set.push(format_args!("{} = ", assignment.column()));
            match assignment {
                PatchColumn::Name(name) => set.push_bind_unseparated(name),
                PatchColumn::Type(habit_type) => set.push_bind_unseparated(habit_type.as_str()),
            };
        }
        set.push("updated_at = MAX(");
        set.push_bind_unseparated(now_millis());
        set.push_unseparated(", updated_at + 1)");
        set.push(format_args!("synced = {}", bool_to_db(false)));
        builder.push(" WHERE id = ");
        builder.push_bind(id.to_string());

        let result = builder
            .build()
            .execute(&pool)
            .await
            .map_err(Error::Database)?;

        check_rows_affected(HabitOperation::Update, id, result.rows_affected())
    }

    /// Mark a habit archived; an unknown id completes without effect
    pub async fn archive(&self, id: Uuid) -> Result<()> {
        self.set_archived(id, true, HabitOperation::Archive).await
    }

    /// Mark a habit active again; an unknown id completes without effect
    pub async fn unarchive(&self, id: Uuid) -> Result<()> {
        self.set_archived(id, false, HabitOperation::Unarchive).await
    }

    /// Physically delete a habit, only if it is archived
    ///
    /// Dependent habit logs go with it through the foreign-key cascade.
    /// Fails with [`Error::PreconditionNotMet`] when the id is unknown or the
    /// habit is still active.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let pool = self.db.acquire().await?;

        let result = sqlx::query("DELETE FROM habits WHERE id = ? AND archived = 1")
            .bind(id.to_string())
            .execute(&pool)
            .await
            .map_err(Error::Database)?;

        check_rows_affected(HabitOperation::Delete, id, result.rows_affected())
    }

    async fn set_archived(&self, id: Uuid, archived: bool, operation: HabitOperation) -> Result<()> {
        let pool = self.db.acquire().await?;

        let result = sqlx::query(
            r#"
            UPDATE habits
            SET archived = ?, updated_at = MAX(?, updated_at + 1), synced = 0
            WHERE id = ?
            "#,
        )
        .bind(bool_to_db(archived))
        .bind(now_millis())
        .bind(id.to_string())
        .execute(&pool)
        .await
        .map_err(Error::Database)?;

        check_rows_affected(operation, id, result.rows_affected())
    }
}

#[async_trait]
impl HabitRepositoryTrait for HabitRepository {
    async fn create(&self, input: NewHabit) -> Result<Uuid> {
        HabitRepository::create(self, input).await
    }

    async fn read_all(&self) -> Result<Vec<Habit>> {
        HabitRepository::read_all(self).await
    }

    async fn read_archived(&self) -> Result<Vec<Habit>> {
        HabitRepository::read_archived(self).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Habit>> {
        HabitRepository::get(self, id).await
    }

    async fn update(&self, id: Uuid, patch: HabitPatch) -> Result<()> {
        HabitRepository::update(self, id, patch).await
    }

    async fn archive(&self, id: Uuid) -> Result<()> {
        HabitRepository::archive(self, id).await
    }

    async fn unarchive(&self, id: Uuid) -> Result<()> {
        HabitRepository::unarchive(self, id).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        HabitRepository::delete(self, id).await
    }
}

fn check_rows_affected(operation: HabitOperation, id: Uuid, rows_affected: u64) -> Result<()> {
    if rows_affected > 0 {
        tracing::debug!(habit_id = %id, %operation, rows_affected, "Habit updated");
        return Ok(());
    }

    match operation.missing_row_policy() {
        MissingRowPolicy::Ignore => {
            tracing::debug!(habit_id = %id, %operation, "No habit matched, nothing changed");
            Ok(())
        }
        MissingRowPolicy::Fail => {
            tracing::warn!(habit_id = %id, %operation, "Habit not found or not archived");
            Err(Error::PreconditionNotMet(format!(
                "Failed to {} habit {}: not found or not archived",
                operation, id
            )))
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
