use rusqlite::{params, Row};

use crate::db::models::{Workspace, WorkspaceStatus};
use crate::db::{now_timestamp, DbPool};
use crate::error::AppError;

fn row_to_workspace(row: &Row) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        id: row.get("id")?,
        name: row.get("name")?,
        status: WorkspaceStatus::from(row.get::<_, String>("status")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Workspace, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM workspaces WHERE id = ?1",
        params![id],
        row_to_workspace,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Workspace {id}")),
        other => AppError::Database(other),
    })
}

pub fn get_by_status(pool: &DbPool, status: &WorkspaceStatus) -> Result<Vec<Workspace>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM workspaces WHERE status = ?1 ORDER BY updated_at ASC",
    )?;
    let rows = stmt.query_map(params![status.as_str()], row_to_workspace)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn create(pool: &DbPool, name: &str, status: &WorkspaceStatus) -> Result<Workspace, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".into()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO workspaces (id, name, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, name, status.as_str(), now],
    )?;

    get_by_id(pool, &id)
}

/// Set the status and touch `updated_at`. Writing the current status again is a no-op
/// apart from the timestamp.
pub fn update_status(pool: &DbPool, id: &str, status: &WorkspaceStatus) -> Result<(), AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE workspaces SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("Workspace {id}")));
    }
    Ok(())
}

/// Overwrite `updated_at` with a raw value. Producers own this column; exposed for
/// imports and fixtures that replay historical state.
pub fn set_updated_at(pool: &DbPool, id: &str, updated_at: &str) -> Result<(), AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE workspaces SET updated_at = ?1 WHERE id = ?2",
        params![updated_at, id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("Workspace {id}")));
    }
    Ok(())
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM workspaces WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
