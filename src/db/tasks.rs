//! Task row operations.
//!
//! The task table is deliberately thin: the dependency service reads id and
//! status, and offers just enough CRUD for the HTTP surface to be usable
//! end-to-end. All reads see live rows only (deleted_at IS NULL).

use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::{Task, TaskId, TaskStatus};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status_raw: String = row.get("status")?;
    let status = TaskStatus::parse(&status_raw).unwrap_or(TaskStatus::Pending);

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        status,
        team_id: row.get("team_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

/// Internal helper to get a live task using an existing connection
/// (avoids re-entering the connection lock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: TaskId) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1 AND deleted_at IS NULL")?;

    match stmt.query_row(params![task_id], parse_task_row) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a task.
    pub fn create_task(&self, title: &str, team_id: Option<&str>) -> Result<Task> {
        if title.trim().is_empty() {
            return Err(ApiError::invalid_value("title", "title must not be empty").into());
        }

        self.with_conn(|conn| {
            let now = now_ms();
            conn.execute(
                "INSERT INTO tasks (title, status, team_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![title, TaskStatus::Pending.as_str(), team_id, now],
            )?;
            let id = conn.last_insert_rowid();

            Ok(Task {
                id,
                title: title.to_string(),
                status: TaskStatus::Pending,
                team_id: team_id.map(String::from),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
        })
    }

    /// Get a live task by id.
    pub fn get_task(&self, task_id: TaskId) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// List live tasks, optionally filtered by team.
    pub fn list_tasks(&self, team_id: Option<&str>) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let tasks = if let Some(team) = team_id {
                let mut stmt = conn.prepare(
                    "SELECT * FROM tasks
                     WHERE team_id = ?1 AND deleted_at IS NULL
                     ORDER BY created_at",
                )?;
                stmt.query_map(params![team], parse_task_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                let mut stmt = conn.prepare(
                    "SELECT * FROM tasks WHERE deleted_at IS NULL ORDER BY created_at",
                )?;
                stmt.query_map([], parse_task_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };

            Ok(tasks)
        })
    }

    /// Update a task's status. Returns the updated task.
    pub fn update_task_status(&self, task_id: TaskId, status: TaskStatus) -> Result<Task> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET status = ?2, updated_at = ?3
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![task_id, status.as_str(), now_ms()],
            )?;
            if updated == 0 {
                return Err(ApiError::task_not_found(task_id).into());
            }

            match get_task_internal(conn, task_id)? {
                Some(task) => Ok(task),
                None => Err(ApiError::task_not_found(task_id).into()),
            }
        })
    }

    /// Soft-delete a task. Idempotent: deleting an already-deleted task is a no-op.
    pub fn soft_delete_task(&self, task_id: TaskId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET deleted_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![task_id, now_ms()],
            )?;
            Ok(())
        })
    }
}
