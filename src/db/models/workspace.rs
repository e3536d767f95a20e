use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_status! {
    /// Lifecycle status of a workspace as written by producers.
    pub enum WorkspaceStatus {
        Active => "active",
        ProcessingTasks => "processing_tasks",
        NeedsIntervention => "needs_intervention",
        Paused => "paused",
        Completed => "completed",
        Error => "error",
    }
}

// ============================================================================
// Workspaces
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[ts(type = "string")]
    pub status: WorkspaceStatus,
    pub created_at: String,
    /// RFC 3339, but producers are not trusted to always write a parseable value.
    pub updated_at: String,
}
