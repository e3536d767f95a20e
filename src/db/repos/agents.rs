use rusqlite::{params, Row};

use crate::db::models::{AgentRecord, AgentStatus};
use crate::db::{now_timestamp, DbPool};
use crate::error::AppError;

fn row_to_agent(row: &Row) -> rusqlite::Result<AgentRecord> {
    Ok(AgentRecord {
        id: row.get("id")?,
        workspace_id: row.get("workspace_id")?,
        name: row.get("name")?,
        status: AgentStatus::from(row.get::<_, String>("status")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_by_workspace(pool: &DbPool, workspace_id: &str) -> Result<Vec<AgentRecord>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM agents WHERE workspace_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![workspace_id], row_to_agent)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<AgentRecord, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM agents WHERE id = ?1", params![id], row_to_agent)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Agent {id}")),
            other => AppError::Database(other),
        })
}

pub fn create(
    pool: &DbPool,
    workspace_id: &str,
    name: &str,
    status: &AgentStatus,
) -> Result<AgentRecord, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO agents (id, workspace_id, name, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, workspace_id, name, status.as_str(), now],
    )?;

    get_by_id(pool, &id)
}

pub fn update_status(pool: &DbPool, id: &str, status: &AgentStatus) -> Result<(), AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE agents SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("Agent {id}")));
    }
    Ok(())
}
