use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_status! {
    /// Status of an agent (worker) record.
    pub enum AgentStatus {
        Active => "active",
        Available => "available",
        Busy => "busy",
        Inactive => "inactive",
        Error => "error",
    }
}

impl AgentStatus {
    /// Whether the agent can pick up work.
    pub fn is_available(&self) -> bool {
        matches!(self, AgentStatus::Active | AgentStatus::Available)
    }
}

// ============================================================================
// Agents
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgentRecord {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    #[ts(type = "string")]
    pub status: AgentStatus,
    pub created_at: String,
    pub updated_at: String,
}
