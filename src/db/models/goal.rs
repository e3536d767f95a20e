use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Goals
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GoalRecord {
    pub id: String,
    pub workspace_id: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: String,
}
