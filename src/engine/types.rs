use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Issue severity
// ============================================================================

/// Severity of a detected health issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum HealthLevel {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl HealthLevel {
    /// Points subtracted from the 100-point health score per issue.
    pub fn deduction(self) -> f64 {
        match self {
            HealthLevel::Info => 5.0,
            HealthLevel::Warning => 15.0,
            HealthLevel::Critical => 30.0,
            HealthLevel::Emergency => 50.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthLevel::Info => "info",
            HealthLevel::Warning => "warning",
            HealthLevel::Critical => "critical",
            HealthLevel::Emergency => "emergency",
        }
    }
}

// ============================================================================
// Recovery strategies
// ============================================================================

/// Named remediation action. Execution lives in [`super::recovery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RecoveryStrategy {
    AutoCleanup,
    StatusReset,
    TaskLimitIncrease,
    DuplicateRemoval,
    AgentReactivation,
    ManualIntervention,
}

impl RecoveryStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryStrategy::AutoCleanup => "auto_cleanup",
            RecoveryStrategy::StatusReset => "status_reset",
            RecoveryStrategy::TaskLimitIncrease => "task_limit_increase",
            RecoveryStrategy::DuplicateRemoval => "duplicate_removal",
            RecoveryStrategy::AgentReactivation => "agent_reactivation",
            RecoveryStrategy::ManualIntervention => "manual_intervention",
        }
    }
}

impl std::fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Issues and reports
// ============================================================================

/// A single abnormal condition found in a workspace snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HealthIssue {
    pub level: HealthLevel,
    pub issue_type: String,
    pub description: String,
    pub affected_count: u32,
    pub suggested_recovery: Option<RecoveryStrategy>,
    pub auto_recoverable: bool,
    /// In [0, 1]. Gates automatic application of `suggested_recovery`.
    pub recovery_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkspaceHealthReport {
    pub workspace_id: String,
    pub is_healthy: bool,
    pub overall_score: f64,
    pub issues: Vec<HealthIssue>,
    pub recommended_actions: Vec<String>,
    pub can_auto_recover: bool,
    pub recovery_strategies: Vec<RecoveryStrategy>,
    pub last_check_time: String,
    pub next_check_recommended: String,
}

/// Score at or above which a workspace is considered healthy.
pub const HEALTHY_SCORE: f64 = 70.0;

pub const HEALTHY_ACTION: &str = "Workspace is healthy — no action required";

/// Outcome of one recovery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecoveryResult {
    pub success: bool,
    pub strategy_used: RecoveryStrategy,
    pub issues_resolved: Vec<String>,
    pub issues_remaining: Vec<String>,
    pub new_health_score: f64,
    pub recovery_time_seconds: f64,
}

// ============================================================================
// Fleet sweep
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SweepDetail {
    pub name: String,
    pub was_recovered: bool,
    pub health_score: f64,
    pub issues_found: u32,
    pub recovery_attempted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FleetSweepSummary {
    pub stuck_count: u32,
    pub recovered_count: u32,
    pub details: BTreeMap<String, SweepDetail>,
}
