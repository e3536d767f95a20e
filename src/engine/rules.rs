//! Issue detection: fixed heuristics over a [`HealthSnapshot`].
//!
//! Pure functions, no DB or async dependencies. Every rule in [`RULES`] is
//! evaluated independently and the output keeps rule order.

use std::collections::HashMap;

use chrono::Duration;

use crate::db::models::{TaskStatus, WorkspaceStatus};

use super::collector::HealthSnapshot;
use super::dedup::normalize_task_name;
use super::timestamp::elapsed_since;
use super::types::{HealthIssue, HealthLevel, RecoveryStrategy, HEALTHY_ACTION};

pub const NEEDS_INTERVENTION: &str = "workspace_needs_intervention";
pub const STUCK_PROCESSING: &str = "workspace_stuck_processing";
pub const EXCESSIVE_PENDING: &str = "excessive_pending_tasks";
pub const DUPLICATE_TASKS: &str = "duplicate_tasks";
pub const NO_AVAILABLE_AGENTS: &str = "no_available_agents";
pub const LOW_AGENT_AVAILABILITY: &str = "low_agent_availability";
pub const HIGH_FAILURE_RATE: &str = "high_failure_rate";

/// Fraction of failed tasks above which the failure rate is flagged.
pub const FAILURE_RATE_THRESHOLD: f64 = 0.3;
/// Fewer available agents than this is flagged as low availability.
pub const MIN_AVAILABLE_AGENTS: usize = 2;

/// Per-check parameters the rules need beyond the snapshot.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub pending_task_limit: u32,
    pub duplicate_task_threshold: u32,
    pub stuck_after: Duration,
}

pub type Rule = fn(&HealthSnapshot, &RuleContext) -> Option<HealthIssue>;

pub const RULES: &[Rule] = &[
    needs_intervention,
    stuck_processing,
    excessive_pending_tasks,
    duplicate_tasks,
    no_available_agents,
    low_agent_availability,
    high_failure_rate,
];

pub fn detect_issues(snapshot: &HealthSnapshot, ctx: &RuleContext) -> Vec<HealthIssue> {
    RULES.iter().filter_map(|rule| rule(snapshot, ctx)).collect()
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

pub fn needs_intervention(snapshot: &HealthSnapshot, _ctx: &RuleContext) -> Option<HealthIssue> {
    if snapshot.workspace.status != WorkspaceStatus::NeedsIntervention {
        return None;
    }
    Some(HealthIssue {
        level: HealthLevel::Critical,
        issue_type: NEEDS_INTERVENTION.into(),
        description: "Workspace is flagged as needing intervention".into(),
        affected_count: 1,
        suggested_recovery: Some(RecoveryStrategy::StatusReset),
        auto_recoverable: true,
        recovery_confidence: 0.9,
    })
}

/// A `processing_tasks` workspace whose `updated_at` is older than the stuck
/// window, or cannot be read at all. The unreadable case is reported with
/// lower confidence rather than skipped.
pub fn stuck_processing(snapshot: &HealthSnapshot, ctx: &RuleContext) -> Option<HealthIssue> {
    if snapshot.workspace.status != WorkspaceStatus::ProcessingTasks {
        return None;
    }

    match elapsed_since(&snapshot.workspace.updated_at, snapshot.collected_at) {
        Some(idle) if idle > ctx.stuck_after => Some(HealthIssue {
            level: HealthLevel::Critical,
            issue_type: STUCK_PROCESSING.into(),
            description: format!(
                "Workspace has been processing tasks with no update for {} minutes",
                idle.num_minutes()
            ),
            affected_count: 1,
            suggested_recovery: Some(RecoveryStrategy::StatusReset),
            auto_recoverable: true,
            recovery_confidence: 0.95,
        }),
        Some(_) => None,
        None => Some(HealthIssue {
            level: HealthLevel::Warning,
            issue_type: STUCK_PROCESSING.into(),
            description: format!(
                "Workspace is processing tasks but its last update time '{}' is unreadable",
                snapshot.workspace.updated_at
            ),
            affected_count: 1,
            suggested_recovery: Some(RecoveryStrategy::StatusReset),
            auto_recoverable: true,
            recovery_confidence: 0.7,
        }),
    }
}

pub fn excessive_pending_tasks(
    snapshot: &HealthSnapshot,
    ctx: &RuleContext,
) -> Option<HealthIssue> {
    let pending = snapshot
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count();
    let limit = ctx.pending_task_limit as usize;
    if pending <= limit {
        return None;
    }
    Some(HealthIssue {
        level: HealthLevel::Warning,
        issue_type: EXCESSIVE_PENDING.into(),
        description: format!("{pending} pending tasks exceed the limit of {limit}"),
        affected_count: (pending - limit) as u32,
        suggested_recovery: Some(RecoveryStrategy::DuplicateRemoval),
        auto_recoverable: true,
        recovery_confidence: 0.8,
    })
}

/// Open tasks grouped by normalized name; groups larger than the duplicate
/// threshold contribute their excess.
pub fn duplicate_tasks(snapshot: &HealthSnapshot, ctx: &RuleContext) -> Option<HealthIssue> {
    let mut groups: HashMap<String, usize> = HashMap::new();
    for task in snapshot.tasks.iter().filter(|t| t.status.is_open()) {
        *groups.entry(normalize_task_name(&task.name)).or_default() += 1;
    }

    let threshold = ctx.duplicate_task_threshold as usize;
    let offending: Vec<usize> = groups
        .values()
        .copied()
        .filter(|&count| count > threshold)
        .collect();
    if offending.is_empty() {
        return None;
    }

    let excess: usize = offending.iter().map(|count| count - threshold).sum();
    Some(HealthIssue {
        level: HealthLevel::Warning,
        issue_type: DUPLICATE_TASKS.into(),
        description: format!(
            "{} task name(s) repeated more than {} times ({} excess tasks)",
            offending.len(),
            threshold,
            excess
        ),
        affected_count: excess as u32,
        suggested_recovery: Some(RecoveryStrategy::DuplicateRemoval),
        auto_recoverable: true,
        recovery_confidence: 0.95,
    })
}

fn available_agents(snapshot: &HealthSnapshot) -> usize {
    snapshot
        .agents
        .iter()
        .filter(|a| a.status.is_available())
        .count()
}

pub fn no_available_agents(snapshot: &HealthSnapshot, _ctx: &RuleContext) -> Option<HealthIssue> {
    if available_agents(snapshot) > 0 {
        return None;
    }
    Some(HealthIssue {
        level: HealthLevel::Critical,
        issue_type: NO_AVAILABLE_AGENTS.into(),
        description: format!(
            "No active or available agents ({} agents total)",
            snapshot.agents.len()
        ),
        affected_count: snapshot.agents.len() as u32,
        suggested_recovery: Some(RecoveryStrategy::AgentReactivation),
        auto_recoverable: true,
        recovery_confidence: 0.7,
    })
}

pub fn low_agent_availability(
    snapshot: &HealthSnapshot,
    _ctx: &RuleContext,
) -> Option<HealthIssue> {
    let available = available_agents(snapshot);
    if available == 0 || available >= MIN_AVAILABLE_AGENTS {
        return None;
    }
    Some(HealthIssue {
        level: HealthLevel::Warning,
        issue_type: LOW_AGENT_AVAILABILITY.into(),
        description: format!("Only {available} agent(s) available to pick up work"),
        affected_count: available as u32,
        suggested_recovery: Some(RecoveryStrategy::AgentReactivation),
        auto_recoverable: false,
        recovery_confidence: 0.5,
    })
}

pub fn high_failure_rate(snapshot: &HealthSnapshot, _ctx: &RuleContext) -> Option<HealthIssue> {
    let total = snapshot.tasks.len();
    if total == 0 {
        return None;
    }
    let failed = snapshot
        .tasks
        .iter()
        .filter(|t| t.status.is_problem())
        .count();
    let rate = failed as f64 / total as f64;
    if rate <= FAILURE_RATE_THRESHOLD {
        return None;
    }
    Some(HealthIssue {
        level: HealthLevel::Warning,
        issue_type: HIGH_FAILURE_RATE.into(),
        description: format!(
            "{failed} of {total} tasks failed ({:.0}% failure rate)",
            rate * 100.0
        ),
        affected_count: failed as u32,
        suggested_recovery: Some(RecoveryStrategy::AutoCleanup),
        auto_recoverable: false,
        recovery_confidence: 0.6,
    })
}

// ---------------------------------------------------------------------------
// Operator guidance
// ---------------------------------------------------------------------------

/// Human-readable guidance for each issue. Never empty.
pub fn recommended_actions(issues: &[HealthIssue]) -> Vec<String> {
    if issues.is_empty() {
        return vec![HEALTHY_ACTION.to_string()];
    }
    issues.iter().map(recommended_action).collect()
}

fn recommended_action(issue: &HealthIssue) -> String {
    match issue.issue_type.as_str() {
        NEEDS_INTERVENTION => {
            "Review the workspace and reset its status to active once the blocker is cleared".into()
        }
        STUCK_PROCESSING => {
            "Reset the workspace status; task executors appear to have stalled".into()
        }
        EXCESSIVE_PENDING => format!(
            "Reduce the backlog by {} tasks: remove duplicates or add agents",
            issue.affected_count
        ),
        DUPLICATE_TASKS => format!(
            "Remove {} duplicate tasks to avoid repeated work",
            issue.affected_count
        ),
        NO_AVAILABLE_AGENTS => "Reactivate agents so pending tasks can be picked up".into(),
        LOW_AGENT_AVAILABILITY => {
            "Add or reactivate agents to increase processing capacity".into()
        }
        HIGH_FAILURE_RATE => {
            "Inspect failed tasks for a common cause before retrying them".into()
        }
        _ => issue.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AgentRecord, AgentStatus, TaskRecord, Workspace};
    use chrono::{TimeZone, Utc};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn ctx() -> RuleContext {
        RuleContext {
            pending_task_limit: 180,
            duplicate_task_threshold: 3,
            stuck_after: Duration::minutes(10),
        }
    }

    fn snapshot(status: WorkspaceStatus, updated_at: &str) -> HealthSnapshot {
        let ws = Workspace {
            id: "ws-1".into(),
            name: "Launch".into(),
            status,
            created_at: "2026-05-01T00:00:00.000Z".into(),
            updated_at: updated_at.into(),
        };
        let mut snap = HealthSnapshot::bare(ws, now());
        snap.agents = (0..3).map(|i| agent(i, AgentStatus::Available)).collect();
        snap
    }

    fn healthy() -> HealthSnapshot {
        snapshot(WorkspaceStatus::Active, "2026-05-01T11:59:00.000Z")
    }

    fn task(i: usize, name: &str, status: TaskStatus) -> TaskRecord {
        TaskRecord {
            id: format!("t-{i}"),
            workspace_id: "ws-1".into(),
            name: name.into(),
            status,
            assigned_agent_id: None,
            created_at: "2026-05-01T10:00:00.000Z".into(),
            updated_at: "2026-05-01T10:00:00.000Z".into(),
        }
    }

    fn agent(i: usize, status: AgentStatus) -> AgentRecord {
        AgentRecord {
            id: format!("a-{i}"),
            workspace_id: "ws-1".into(),
            name: format!("agent {i}"),
            status,
            created_at: "2026-05-01T10:00:00.000Z".into(),
            updated_at: "2026-05-01T10:00:00.000Z".into(),
        }
    }

    #[test]
    fn test_healthy_workspace_has_no_issues() {
        assert!(detect_issues(&healthy(), &ctx()).is_empty());
    }

    #[test]
    fn test_needs_intervention() {
        let snap = snapshot(WorkspaceStatus::NeedsIntervention, "2026-05-01T11:59:00Z");
        let issues = detect_issues(&snap, &ctx());
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.issue_type, NEEDS_INTERVENTION);
        assert_eq!(issue.level, HealthLevel::Critical);
        assert_eq!(issue.suggested_recovery, Some(RecoveryStrategy::StatusReset));
        assert_eq!(issue.recovery_confidence, 0.9);
        assert!(issue.auto_recoverable);
    }

    #[test]
    fn test_stuck_processing_past_window() {
        let snap = snapshot(WorkspaceStatus::ProcessingTasks, "2026-05-01T11:30:00Z");
        let issue = stuck_processing(&snap, &ctx()).unwrap();
        assert_eq!(issue.level, HealthLevel::Critical);
        assert_eq!(issue.recovery_confidence, 0.95);
        assert!(issue.description.contains("30 minutes"));
    }

    #[test]
    fn test_stuck_processing_within_window() {
        let snap = snapshot(WorkspaceStatus::ProcessingTasks, "2026-05-01T11:55:00Z");
        assert!(stuck_processing(&snap, &ctx()).is_none());
        // exactly on the boundary is not stuck
        let snap = snapshot(WorkspaceStatus::ProcessingTasks, "2026-05-01T11:50:00Z");
        assert!(stuck_processing(&snap, &ctx()).is_none());
    }

    #[test]
    fn test_stuck_processing_unparsable_timestamp() {
        let snap = snapshot(WorkspaceStatus::ProcessingTasks, "last tuesday");
        let issue = stuck_processing(&snap, &ctx()).unwrap();
        assert_eq!(issue.level, HealthLevel::Warning);
        assert_eq!(issue.recovery_confidence, 0.7);
        assert!(issue.auto_recoverable);
    }

    #[test]
    fn test_stale_timestamp_ignored_when_not_processing() {
        let snap = snapshot(WorkspaceStatus::Active, "garbage");
        assert!(stuck_processing(&snap, &ctx()).is_none());
    }

    #[test]
    fn test_excessive_pending_reports_excess() {
        let mut snap = healthy();
        snap.tasks = (0..250)
            .map(|i| task(i, &format!("task {i}"), TaskStatus::Pending))
            .collect();
        let issue = excessive_pending_tasks(&snap, &ctx()).unwrap();
        assert_eq!(issue.level, HealthLevel::Warning);
        assert_eq!(issue.affected_count, 70);
        assert_eq!(issue.recovery_confidence, 0.8);
        assert_eq!(
            issue.suggested_recovery,
            Some(RecoveryStrategy::DuplicateRemoval)
        );
    }

    #[test]
    fn test_pending_at_limit_is_fine() {
        let mut snap = healthy();
        snap.tasks = (0..180)
            .map(|i| task(i, &format!("task {i}"), TaskStatus::Pending))
            .collect();
        assert!(excessive_pending_tasks(&snap, &ctx()).is_none());
    }

    #[test]
    fn test_duplicate_tasks_sum_excess_across_groups() {
        let mut snap = healthy();
        let mut tasks = Vec::new();
        for i in 0..5 {
            tasks.push(task(i, "Write intro", TaskStatus::Pending));
        }
        for i in 5..9 {
            tasks.push(task(i, "write  INTRO", TaskStatus::InProgress));
        }
        for i in 9..13 {
            tasks.push(task(i, "Edit draft", TaskStatus::Pending));
        }
        // finished copies do not count
        for i in 13..20 {
            tasks.push(task(i, "Edit draft", TaskStatus::Completed));
        }
        snap.tasks = tasks;

        let issue = duplicate_tasks(&snap, &ctx()).unwrap();
        // "write intro": 9 open → 6 over; "edit draft": 4 open → 1 over
        assert_eq!(issue.affected_count, 7);
        assert_eq!(issue.recovery_confidence, 0.95);
    }

    #[test]
    fn test_duplicates_at_threshold_are_fine() {
        let mut snap = healthy();
        snap.tasks = (0..3).map(|i| task(i, "Same", TaskStatus::Pending)).collect();
        assert!(duplicate_tasks(&snap, &ctx()).is_none());
    }

    #[test]
    fn test_no_available_agents() {
        let mut snap = healthy();
        snap.agents = vec![agent(0, AgentStatus::Inactive), agent(1, AgentStatus::Busy)];
        let issues = detect_issues(&snap, &ctx());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, NO_AVAILABLE_AGENTS);
        assert_eq!(issues[0].level, HealthLevel::Critical);
        assert_eq!(issues[0].recovery_confidence, 0.7);
        assert!(issues[0].auto_recoverable);
    }

    #[test]
    fn test_no_agents_at_all_is_no_available_agents() {
        let mut snap = healthy();
        snap.agents.clear();
        let issue = no_available_agents(&snap, &ctx()).unwrap();
        assert_eq!(issue.affected_count, 0);
        assert!(low_agent_availability(&snap, &ctx()).is_none());
    }

    #[test]
    fn test_low_agent_availability_not_auto_recoverable() {
        let mut snap = healthy();
        snap.agents = vec![agent(0, AgentStatus::Active), agent(1, AgentStatus::Error)];
        let issues = detect_issues(&snap, &ctx());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, LOW_AGENT_AVAILABILITY);
        assert!(!issues[0].auto_recoverable);
        assert_eq!(issues[0].recovery_confidence, 0.5);
    }

    #[test]
    fn test_high_failure_rate() {
        let mut snap = healthy();
        snap.tasks = vec![
            task(0, "a", TaskStatus::Failed),
            task(1, "b", TaskStatus::Failed),
            task(2, "c", TaskStatus::Completed),
            task(3, "d", TaskStatus::Completed),
        ];
        let issue = high_failure_rate(&snap, &ctx()).unwrap();
        assert_eq!(issue.affected_count, 2);
        assert!(!issue.auto_recoverable);
        assert_eq!(issue.suggested_recovery, Some(RecoveryStrategy::AutoCleanup));
    }

    #[test]
    fn test_failure_rate_at_threshold_is_fine() {
        let mut snap = healthy();
        snap.tasks = (0..10)
            .map(|i| {
                let status = if i < 3 { TaskStatus::Failed } else { TaskStatus::Completed };
                task(i, &format!("t{i}"), status)
            })
            .collect();
        assert!(high_failure_rate(&snap, &ctx()).is_none());
    }

    #[test]
    fn test_rules_evaluated_independently_in_order() {
        let mut snap = snapshot(WorkspaceStatus::ProcessingTasks, "???");
        snap.agents.clear();
        snap.tasks = (0..4).map(|i| task(i, "x", TaskStatus::Failed)).collect();
        let types: Vec<_> = detect_issues(&snap, &ctx())
            .into_iter()
            .map(|i| i.issue_type)
            .collect();
        assert_eq!(types, vec![STUCK_PROCESSING, NO_AVAILABLE_AGENTS, HIGH_FAILURE_RATE]);
    }

    #[test]
    fn test_recommended_actions_never_empty() {
        assert_eq!(recommended_actions(&[]), vec![HEALTHY_ACTION.to_string()]);
        let snap = snapshot(WorkspaceStatus::NeedsIntervention, "2026-05-01T11:59:00Z");
        let actions = recommended_actions(&detect_issues(&snap, &ctx()));
        assert_eq!(actions.len(), 1);
        assert!(actions[0].contains("reset its status"));
    }
}
