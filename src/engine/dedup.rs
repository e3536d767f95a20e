//! Duplicate-task cleanup collaborator.
//!
//! The controller only invokes [`Deduplicator::cleanup_duplicates`]; the
//! detection policy belongs to the implementation. [`SqliteDeduplicator`] is a
//! minimal reference: per normalized task name it keeps one open task (a
//! started one if any, otherwise the oldest) and deletes the other pending ones.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::db::models::{TaskRecord, TaskStatus};
use crate::db::repos::tasks as task_repo;
use crate::db::{run_blocking, DbPool};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DedupOutcome {
    pub duplicates_removed: u32,
}

#[async_trait]
pub trait Deduplicator: Send + Sync {
    /// Remove duplicate tasks. With `dry_run` nothing is deleted and the
    /// outcome reports what would have been removed.
    async fn cleanup_duplicates(
        &self,
        workspace_id: &str,
        dry_run: bool,
    ) -> Result<DedupOutcome, AppError>;
}

/// Key under which two task names are considered the same work item.
pub fn normalize_task_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub struct SqliteDeduplicator {
    pool: DbPool,
}

impl SqliteDeduplicator {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Deduplicator for SqliteDeduplicator {
    async fn cleanup_duplicates(
        &self,
        workspace_id: &str,
        dry_run: bool,
    ) -> Result<DedupOutcome, AppError> {
        let ws = workspace_id.to_string();
        let tasks = run_blocking(&self.pool, move |pool| task_repo::get_by_workspace(pool, &ws))
            .await
            .map_err(|e| AppError::Dedup(format!("failed to list tasks: {e}")))?;

        let mut groups: HashMap<String, Vec<&TaskRecord>> = HashMap::new();
        for task in tasks.iter().filter(|t| t.status.is_open()) {
            groups
                .entry(normalize_task_name(&task.name))
                .or_default()
                .push(task);
        }

        // Tasks arrive oldest first.
        let mut doomed = Vec::new();
        for group in groups.values().filter(|g| g.len() > 1) {
            let keep = group
                .iter()
                .find(|t| t.status == TaskStatus::InProgress)
                .unwrap_or(&group[0])
                .id
                .as_str();
            doomed.extend(
                group
                    .iter()
                    .filter(|t| t.id != keep && t.status == TaskStatus::Pending)
                    .map(|t| t.id.clone()),
            );
        }

        if dry_run {
            return Ok(DedupOutcome {
                duplicates_removed: doomed.len() as u32,
            });
        }

        let removed = run_blocking(&self.pool, move |pool| task_repo::delete_pending(pool, &doomed))
            .await
            .map_err(|e| AppError::Dedup(format!("failed to delete duplicates: {e}")))?;

        tracing::info!(
            workspace_id = %workspace_id,
            removed,
            "Duplicate tasks removed"
        );
        Ok(DedupOutcome {
            duplicates_removed: removed as u32,
        })
    }
}
