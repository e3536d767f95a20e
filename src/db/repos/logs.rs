use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::models::LogEntry;
use crate::db::{format_timestamp, now_timestamp, DbPool};
use crate::error::AppError;

fn row_to_log(row: &Row) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get("id")?,
        workspace_id: row.get("workspace_id")?,
        level: row.get("level")?,
        message: row.get("message")?,
        created_at: row.get("created_at")?,
    })
}

/// Log entries written at or after `since`, oldest first.
pub fn get_since(
    pool: &DbPool,
    workspace_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<LogEntry>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM activity_logs
         WHERE workspace_id = ?1 AND created_at >= ?2
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![workspace_id, format_timestamp(since)], row_to_log)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn create(
    pool: &DbPool,
    workspace_id: &str,
    level: &str,
    message: &str,
) -> Result<LogEntry, AppError> {
    create_at(pool, workspace_id, level, message, &now_timestamp())
}

/// Insert an entry with an explicit timestamp (backfills and imports).
pub fn create_at(
    pool: &DbPool,
    workspace_id: &str,
    level: &str,
    message: &str,
    created_at: &str,
) -> Result<LogEntry, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO activity_logs (id, workspace_id, level, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, workspace_id, level, message, created_at],
    )?;
    Ok(LogEntry {
        id,
        workspace_id: workspace_id.to_string(),
        level: level.to_string(),
        message: message.to_string(),
        created_at: created_at.to_string(),
    })
}
