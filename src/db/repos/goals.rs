use rusqlite::{params, Row};

use crate::db::models::GoalRecord;
use crate::db::{now_timestamp, DbPool};
use crate::error::AppError;

fn row_to_goal(row: &Row) -> rusqlite::Result<GoalRecord> {
    Ok(GoalRecord {
        id: row.get("id")?,
        workspace_id: row.get("workspace_id")?,
        description: row.get("description")?,
        is_active: row.get::<_, i32>("is_active")? != 0,
        created_at: row.get("created_at")?,
    })
}

pub fn get_active_by_workspace(pool: &DbPool, workspace_id: &str) -> Result<Vec<GoalRecord>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM goals WHERE workspace_id = ?1 AND is_active = 1 ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![workspace_id], row_to_goal)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn create(
    pool: &DbPool,
    workspace_id: &str,
    description: &str,
    is_active: bool,
) -> Result<GoalRecord, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO goals (id, workspace_id, description, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, workspace_id, description, is_active as i32, now],
    )?;

    conn.query_row("SELECT * FROM goals WHERE id = ?1", params![id], row_to_goal)
        .map_err(AppError::from)
}
