use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Activity Logs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LogEntry {
    pub id: String,
    pub workspace_id: String,
    /// "debug" | "info" | "warning" | "error"
    pub level: String,
    pub message: String,
    pub created_at: String,
}
