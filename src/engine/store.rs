//! Store accessor: the narrow read/write contract the controller needs from
//! the system of record.
//!
//! The controller only ever talks to [`WorkspaceStore`]; [`SqliteWorkspaceStore`]
//! is the reference implementation over the crate's own SQLite schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{
    AgentRecord, AgentStatus, GoalRecord, LogEntry, TaskRecord, Workspace, WorkspaceStatus,
};
use crate::db::repos::{agents as agent_repo, goals as goal_repo, logs as log_repo};
use crate::db::repos::{tasks as task_repo, workspaces as workspace_repo};
use crate::db::{run_blocking, DbPool};
use crate::error::AppError;

/// Read/write facade over workspaces, tasks, agents, goals and activity logs.
///
/// Implementations own timeouts. `get_workspace` must return
/// [`AppError::NotFound`] for a missing workspace so callers can tell it
/// apart from a transient failure.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn get_workspace(&self, id: &str) -> Result<Workspace, AppError>;
    async fn list_tasks(&self, workspace_id: &str) -> Result<Vec<TaskRecord>, AppError>;
    async fn list_agents(&self, workspace_id: &str) -> Result<Vec<AgentRecord>, AppError>;
    async fn list_active_goals(&self, workspace_id: &str) -> Result<Vec<GoalRecord>, AppError>;
    async fn list_recent_logs(
        &self,
        workspace_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>, AppError>;
    async fn update_workspace_status(
        &self,
        id: &str,
        status: &WorkspaceStatus,
    ) -> Result<(), AppError>;
    async fn update_agent_status(&self, id: &str, status: &AgentStatus) -> Result<(), AppError>;
    async fn list_workspaces_by_status(
        &self,
        status: &WorkspaceStatus,
    ) -> Result<Vec<Workspace>, AppError>;
}

/// [`WorkspaceStore`] backed by the r2d2 SQLite pool.
#[derive(Clone)]
pub struct SqliteWorkspaceStore {
    pool: DbPool,
}

impl SqliteWorkspaceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Repo calls run on the blocking pool.
#[async_trait]
impl WorkspaceStore for SqliteWorkspaceStore {
    async fn get_workspace(&self, id: &str) -> Result<Workspace, AppError> {
        let id = id.to_string();
        run_blocking(&self.pool, move |pool| workspace_repo::get_by_id(pool, &id)).await
    }

    async fn list_tasks(&self, workspace_id: &str) -> Result<Vec<TaskRecord>, AppError> {
        let ws = workspace_id.to_string();
        run_blocking(&self.pool, move |pool| task_repo::get_by_workspace(pool, &ws)).await
    }

    async fn list_agents(&self, workspace_id: &str) -> Result<Vec<AgentRecord>, AppError> {
        let ws = workspace_id.to_string();
        run_blocking(&self.pool, move |pool| agent_repo::get_by_workspace(pool, &ws)).await
    }

    async fn list_active_goals(&self, workspace_id: &str) -> Result<Vec<GoalRecord>, AppError> {
        let ws = workspace_id.to_string();
        run_blocking(&self.pool, move |pool| goal_repo::get_active_by_workspace(pool, &ws)).await
    }

    async fn list_recent_logs(
        &self,
        workspace_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>, AppError> {
        let ws = workspace_id.to_string();
        run_blocking(&self.pool, move |pool| log_repo::get_since(pool, &ws, since)).await
    }

    async fn update_workspace_status(
        &self,
        id: &str,
        status: &WorkspaceStatus,
    ) -> Result<(), AppError> {
        let (id, status) = (id.to_string(), status.clone());
        run_blocking(&self.pool, move |pool| {
            workspace_repo::update_status(pool, &id, &status)
        })
        .await
    }

    async fn update_agent_status(&self, id: &str, status: &AgentStatus) -> Result<(), AppError> {
        let (id, status) = (id.to_string(), status.clone());
        run_blocking(&self.pool, move |pool| agent_repo::update_status(pool, &id, &status)).await
    }

    async fn list_workspaces_by_status(
        &self,
        status: &WorkspaceStatus,
    ) -> Result<Vec<Workspace>, AppError> {
        let status = status.clone();
        run_blocking(&self.pool, move |pool| workspace_repo::get_by_status(pool, &status)).await
    }
}
