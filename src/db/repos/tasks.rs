use rusqlite::{params, Row};

use crate::db::models::{TaskRecord, TaskStatus};
use crate::db::{now_timestamp, DbPool};
use crate::error::AppError;

fn row_to_task(row: &Row) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get("id")?,
        workspace_id: row.get("workspace_id")?,
        name: row.get("name")?,
        status: TaskStatus::from(row.get::<_, String>("status")?),
        assigned_agent_id: row.get("assigned_agent_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Oldest first. Rows sharing a `created_at` keep insertion order.
pub fn get_by_workspace(pool: &DbPool, workspace_id: &str) -> Result<Vec<TaskRecord>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM tasks WHERE workspace_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![workspace_id], row_to_task)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<TaskRecord, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM tasks WHERE id = ?1", params![id], row_to_task)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Task {id}")),
            other => AppError::Database(other),
        })
}

pub fn create(
    pool: &DbPool,
    workspace_id: &str,
    name: &str,
    status: &TaskStatus,
    assigned_agent_id: Option<&str>,
) -> Result<TaskRecord, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Task name cannot be empty".into()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO tasks (id, workspace_id, name, status, assigned_agent_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, workspace_id, name, status.as_str(), assigned_agent_id, now],
    )?;

    get_by_id(pool, &id)
}

pub fn update_status(pool: &DbPool, id: &str, status: &TaskStatus) -> Result<(), AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("Task {id}")));
    }
    Ok(())
}

/// Delete tasks by id, but only those still pending. Returns the number removed.
pub fn delete_pending(pool: &DbPool, ids: &[String]) -> Result<usize, AppError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let mut removed = 0;
    {
        let mut stmt = tx.prepare("DELETE FROM tasks WHERE id = ?1 AND status = 'pending'")?;
        for id in ids {
            removed += stmt.execute(params![id])?;
        }
    }
    tx.commit()?;
    Ok(removed)
}
