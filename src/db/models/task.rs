use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_status! {
    /// Status of a task record.
    pub enum TaskStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    /// New or active work, i.e. not yet finished one way or another.
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }

    pub fn is_problem(&self) -> bool {
        matches!(self, TaskStatus::Failed)
    }
}

// ============================================================================
// Tasks
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskRecord {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    #[ts(type = "string")]
    pub status: TaskStatus,
    pub assigned_agent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
