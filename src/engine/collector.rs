//! Health data collection: one consistent-enough snapshot of a workspace.

use chrono::{DateTime, Duration, Utc};

use crate::db::models::{AgentRecord, GoalRecord, LogEntry, TaskRecord, Workspace};
use crate::error::AppError;

use super::store::WorkspaceStore;

/// Everything the issue rules look at, read in one pass.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub workspace: Workspace,
    pub tasks: Vec<TaskRecord>,
    pub agents: Vec<AgentRecord>,
    pub active_goals: Vec<GoalRecord>,
    pub recent_logs: Vec<LogEntry>,
    /// Collections that failed to load and were replaced by an empty list.
    pub partial_failures: Vec<String>,
    pub collected_at: DateTime<Utc>,
}

impl HealthSnapshot {
    /// Snapshot with empty collections, for callers that build state by hand.
    pub fn bare(workspace: Workspace, collected_at: DateTime<Utc>) -> Self {
        Self {
            workspace,
            tasks: Vec::new(),
            agents: Vec::new(),
            active_goals: Vec::new(),
            recent_logs: Vec::new(),
            partial_failures: Vec::new(),
            collected_at,
        }
    }
}

/// Load a snapshot of `workspace_id`.
///
/// A missing workspace is fatal ([`AppError::DataUnavailable`]); any other
/// failure loading the workspace record is returned as is. Failures on the
/// secondary collections are logged and degrade to empty lists.
pub async fn collect(
    store: &dyn WorkspaceStore,
    workspace_id: &str,
    log_window: Duration,
    now: DateTime<Utc>,
) -> Result<HealthSnapshot, AppError> {
    let workspace = match store.get_workspace(workspace_id).await {
        Ok(ws) => ws,
        Err(AppError::NotFound(what)) => {
            return Err(AppError::DataUnavailable(what));
        }
        Err(e) => return Err(e),
    };

    let mut snapshot = HealthSnapshot::bare(workspace, now);

    snapshot.tasks = tolerate(
        store.list_tasks(workspace_id).await,
        "tasks",
        workspace_id,
        &mut snapshot.partial_failures,
    );
    snapshot.agents = tolerate(
        store.list_agents(workspace_id).await,
        "agents",
        workspace_id,
        &mut snapshot.partial_failures,
    );
    snapshot.active_goals = tolerate(
        store.list_active_goals(workspace_id).await,
        "goals",
        workspace_id,
        &mut snapshot.partial_failures,
    );
    snapshot.recent_logs = tolerate(
        store
            .list_recent_logs(
                workspace_id,
                now.checked_sub_signed(log_window)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            )
            .await,
        "logs",
        workspace_id,
        &mut snapshot.partial_failures,
    );

    tracing::debug!(
        workspace_id = %workspace_id,
        tasks = snapshot.tasks.len(),
        agents = snapshot.agents.len(),
        goals = snapshot.active_goals.len(),
        logs = snapshot.recent_logs.len(),
        "Health snapshot collected"
    );

    Ok(snapshot)
}

fn tolerate<T>(
    result: Result<Vec<T>, AppError>,
    collection: &str,
    workspace_id: &str,
    failures: &mut Vec<String>,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            let err = AppError::PartialData(format!("{collection}: {e}"));
            tracing::warn!(workspace_id = %workspace_id, "{}", err);
            failures.push(collection.to_string());
            Vec::new()
        }
    }
}
