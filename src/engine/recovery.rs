//! Recovery planning and execution.
//!
//! Planning is pure: it decides which issues are candidates for automatic
//! remediation. Execution applies each candidate's strategy through the
//! store (or the dedup collaborator) only when its confidence clears the
//! configured threshold. Every strategy is idempotent, so concurrent checks
//! racing on the same workspace are tolerated.

use std::collections::HashMap;

use crate::db::models::{AgentStatus, WorkspaceStatus};
use crate::error::AppError;

use super::dedup::Deduplicator;
use super::store::WorkspaceStore;
use super::types::{HealthIssue, RecoveryStrategy};

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPlan {
    pub can_auto_recover: bool,
    /// Every suggested strategy, de-duplicated, in first-seen order. Advisory.
    pub strategies: Vec<RecoveryStrategy>,
    /// Auto-recoverable issues, highest confidence first.
    pub candidates: Vec<HealthIssue>,
}

pub fn plan(issues: &[HealthIssue]) -> RecoveryPlan {
    let mut strategies = Vec::new();
    for strategy in issues.iter().filter_map(|i| i.suggested_recovery) {
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }

    let mut candidates: Vec<HealthIssue> =
        issues.iter().filter(|i| i.auto_recoverable).cloned().collect();
    // Stable sort keeps rule order among equal confidences.
    candidates.sort_by(|a, b| b.recovery_confidence.total_cmp(&a.recovery_confidence));

    RecoveryPlan {
        can_auto_recover: !candidates.is_empty(),
        strategies,
        candidates,
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// What one execution pass did, before the post-recovery re-check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionOutcome {
    pub issues_resolved: Vec<String>,
    pub issues_remaining: Vec<String>,
    /// Strategy of the first resolved issue.
    pub first_strategy: Option<RecoveryStrategy>,
}

pub struct RecoveryExecutor<'a> {
    store: &'a dyn WorkspaceStore,
    dedup: &'a dyn Deduplicator,
    confidence_threshold: f64,
}

impl<'a> RecoveryExecutor<'a> {
    pub fn new(
        store: &'a dyn WorkspaceStore,
        dedup: &'a dyn Deduplicator,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            store,
            dedup,
            confidence_threshold,
        }
    }

    /// Attempt every auto-recoverable issue in `issues`, highest confidence
    /// first. A failure on one issue never stops the others. A strategy
    /// shared by several issues runs at most once per pass.
    pub async fn execute(&self, workspace_id: &str, issues: &[HealthIssue]) -> ExecutionOutcome {
        let plan = plan(issues);
        let mut outcome = ExecutionOutcome::default();
        let mut applied: HashMap<RecoveryStrategy, bool> = HashMap::new();

        for issue in &plan.candidates {
            if issue.recovery_confidence < self.confidence_threshold {
                tracing::info!(
                    workspace_id = %workspace_id,
                    issue = %issue.issue_type,
                    confidence = issue.recovery_confidence,
                    threshold = self.confidence_threshold,
                    "Skipping recovery: confidence below threshold"
                );
                outcome
                    .issues_remaining
                    .push(format!("{} (low confidence)", issue.issue_type));
                continue;
            }

            let Some(strategy) = issue.suggested_recovery else {
                outcome
                    .issues_remaining
                    .push(format!("{} (no strategy)", issue.issue_type));
                continue;
            };

            let succeeded = match applied.get(&strategy) {
                Some(&done) => done,
                None => {
                    let result = self.apply(workspace_id, strategy).await;
                    let done = match result {
                        Ok(()) => true,
                        Err(AppError::UnknownStrategy(name)) => {
                            tracing::info!(
                                workspace_id = %workspace_id,
                                strategy = %name,
                                "No automated handler for strategy"
                            );
                            false
                        }
                        Err(e) => {
                            tracing::warn!(
                                workspace_id = %workspace_id,
                                strategy = %strategy,
                                "Recovery strategy failed: {}",
                                e
                            );
                            false
                        }
                    };
                    applied.insert(strategy, done);
                    done
                }
            };

            if succeeded {
                if outcome.first_strategy.is_none() {
                    outcome.first_strategy = Some(strategy);
                }
                outcome.issues_resolved.push(issue.issue_type.clone());
            } else {
                outcome
                    .issues_remaining
                    .push(format!("{} (recovery failed)", issue.issue_type));
            }
        }

        for issue in issues.iter().filter(|i| !i.auto_recoverable) {
            outcome
                .issues_remaining
                .push(format!("{} (manual action required)", issue.issue_type));
        }

        outcome
    }

    /// Apply a single strategy. Exhaustive over [`RecoveryStrategy`].
    pub async fn apply(&self, workspace_id: &str, strategy: RecoveryStrategy) -> Result<(), AppError> {
        match strategy {
            RecoveryStrategy::StatusReset => self.reset_status(workspace_id).await,
            RecoveryStrategy::DuplicateRemoval => self.remove_duplicates(workspace_id).await,
            RecoveryStrategy::AgentReactivation => self.reactivate_agents(workspace_id).await,
            RecoveryStrategy::AutoCleanup
            | RecoveryStrategy::TaskLimitIncrease
            | RecoveryStrategy::ManualIntervention => {
                Err(AppError::UnknownStrategy(strategy.as_str().to_string()))
            }
        }
    }

    async fn reset_status(&self, workspace_id: &str) -> Result<(), AppError> {
        self.store
            .update_workspace_status(workspace_id, &WorkspaceStatus::Active)
            .await
            .map_err(|e| AppError::RecoveryApply(format!("status reset: {e}")))?;
        tracing::info!(workspace_id = %workspace_id, "Workspace status reset to active");
        Ok(())
    }

    async fn remove_duplicates(&self, workspace_id: &str) -> Result<(), AppError> {
        let outcome = self
            .dedup
            .cleanup_duplicates(workspace_id, false)
            .await
            .map_err(|e| AppError::RecoveryApply(format!("duplicate removal: {e}")))?;
        tracing::info!(
            workspace_id = %workspace_id,
            removed = outcome.duplicates_removed,
            "Duplicate removal finished"
        );
        Ok(())
    }

    async fn reactivate_agents(&self, workspace_id: &str) -> Result<(), AppError> {
        let agents = self
            .store
            .list_agents(workspace_id)
            .await
            .map_err(|e| AppError::RecoveryApply(format!("agent reactivation: {e}")))?;

        let mut reactivated = 0usize;
        let mut failed = Vec::new();
        for agent in agents.iter().filter(|a| !a.status.is_available()) {
            match self.store.update_agent_status(&agent.id, &AgentStatus::Active).await {
                Ok(()) => reactivated += 1,
                Err(e) => {
                    tracing::warn!(agent_id = %agent.id, "Agent reactivation failed: {}", e);
                    failed.push(agent.id.clone());
                }
            }
        }

        tracing::info!(
            workspace_id = %workspace_id,
            reactivated,
            failed = failed.len(),
            "Agent reactivation finished"
        );

        if failed.is_empty() {
            Ok(())
        } else {
            Err(AppError::RecoveryApply(format!(
                "agent reactivation failed for {}",
                failed.join(", ")
            )))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::TaskStatus;
    use crate::db::repos::{agents, tasks, workspaces};
    use crate::engine::collector::tests::FlakyStore;
    use crate::engine::dedup::DedupOutcome;
    use crate::engine::rules;
    use crate::engine::store::SqliteWorkspaceStore;
    use crate::engine::types::HealthLevel;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Dedup double that records calls and reports a fixed outcome.
    #[derive(Default)]
    pub(crate) struct CountingDedup {
        pub calls: AtomicU32,
        pub removed: u32,
        pub fail: bool,
    }

    #[async_trait::async_trait]
    impl Deduplicator for CountingDedup {
        async fn cleanup_duplicates(
            &self,
            _workspace_id: &str,
            dry_run: bool,
        ) -> Result<DedupOutcome, AppError> {
            assert!(!dry_run, "recovery must not use dry runs");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Dedup("collaborator down".into()));
            }
            Ok(DedupOutcome {
                duplicates_removed: self.removed,
            })
        }
    }

    fn issue(
        issue_type: &str,
        strategy: Option<RecoveryStrategy>,
        auto: bool,
        confidence: f64,
    ) -> HealthIssue {
        HealthIssue {
            level: HealthLevel::Warning,
            issue_type: issue_type.into(),
            description: String::new(),
            affected_count: 1,
            suggested_recovery: strategy,
            auto_recoverable: auto,
            recovery_confidence: confidence,
        }
    }

    #[test]
    fn test_plan_orders_by_confidence_and_dedupes_strategies() {
        let issues = vec![
            issue("a", Some(RecoveryStrategy::StatusReset), true, 0.7),
            issue("b", Some(RecoveryStrategy::DuplicateRemoval), true, 0.95),
            issue("c", Some(RecoveryStrategy::DuplicateRemoval), true, 0.8),
            issue("d", Some(RecoveryStrategy::AutoCleanup), false, 0.6),
        ];
        let p = plan(&issues);
        assert!(p.can_auto_recover);
        assert_eq!(
            p.strategies,
            vec![
                RecoveryStrategy::StatusReset,
                RecoveryStrategy::DuplicateRemoval,
                RecoveryStrategy::AutoCleanup,
            ]
        );
        let order: Vec<_> = p.candidates.iter().map(|i| i.issue_type.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_plan_without_auto_recoverable_issues() {
        let p = plan(&[issue("x", Some(RecoveryStrategy::AutoCleanup), false, 0.99)]);
        assert!(!p.can_auto_recover);
        assert!(p.candidates.is_empty());
        assert_eq!(p.strategies, vec![RecoveryStrategy::AutoCleanup]);
    }

    #[tokio::test]
    async fn test_below_threshold_is_never_applied() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::NeedsIntervention).unwrap();
        let store = SqliteWorkspaceStore::new(pool.clone());
        let dedup = CountingDedup::default();
        let executor = RecoveryExecutor::new(&store, &dedup, 0.8);

        let issues = vec![
            issue("reset", Some(RecoveryStrategy::StatusReset), true, 0.79),
            issue("dupes", Some(RecoveryStrategy::DuplicateRemoval), true, 0.5),
        ];
        let outcome = executor.execute(&ws.id, &issues).await;

        assert!(outcome.issues_resolved.is_empty());
        assert_eq!(
            outcome.issues_remaining,
            vec!["reset (low confidence)", "dupes (low confidence)"]
        );
        assert_eq!(dedup.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            workspaces::get_by_id(&pool, &ws.id).unwrap().status,
            WorkspaceStatus::NeedsIntervention
        );
    }

    #[tokio::test]
    async fn test_status_reset_is_idempotent() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::Active).unwrap();
        let store = SqliteWorkspaceStore::new(pool.clone());
        let dedup = CountingDedup::default();
        let executor = RecoveryExecutor::new(&store, &dedup, 0.8);

        executor.apply(&ws.id, RecoveryStrategy::StatusReset).await.unwrap();
        executor.apply(&ws.id, RecoveryStrategy::StatusReset).await.unwrap();
        assert_eq!(
            workspaces::get_by_id(&pool, &ws.id).unwrap().status,
            WorkspaceStatus::Active
        );
    }

    #[tokio::test]
    async fn test_zero_duplicates_removed_counts_as_resolved() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::Active).unwrap();
        let store = SqliteWorkspaceStore::new(pool);
        let dedup = CountingDedup::default();
        let executor = RecoveryExecutor::new(&store, &dedup, 0.8);

        let issues = vec![issue(
            rules::DUPLICATE_TASKS,
            Some(RecoveryStrategy::DuplicateRemoval),
            true,
            0.95,
        )];
        let outcome = executor.execute(&ws.id, &issues).await;
        assert_eq!(outcome.issues_resolved, vec![rules::DUPLICATE_TASKS]);
        assert!(outcome.issues_remaining.is_empty());
        assert_eq!(outcome.first_strategy, Some(RecoveryStrategy::DuplicateRemoval));
    }

    #[tokio::test]
    async fn test_shared_strategy_runs_once() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::Active).unwrap();
        let store = SqliteWorkspaceStore::new(pool);
        let dedup = CountingDedup {
            removed: 12,
            ..Default::default()
        };
        let executor = RecoveryExecutor::new(&store, &dedup, 0.8);

        let issues = vec![
            issue(rules::EXCESSIVE_PENDING, Some(RecoveryStrategy::DuplicateRemoval), true, 0.8),
            issue(rules::DUPLICATE_TASKS, Some(RecoveryStrategy::DuplicateRemoval), true, 0.95),
        ];
        let outcome = executor.execute(&ws.id, &issues).await;
        assert_eq!(dedup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcome.issues_resolved,
            vec![rules::DUPLICATE_TASKS, rules::EXCESSIVE_PENDING]
        );
    }

    #[tokio::test]
    async fn test_dedup_failure_leaves_issue_remaining() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::NeedsIntervention).unwrap();
        let store = SqliteWorkspaceStore::new(pool.clone());
        let dedup = CountingDedup {
            fail: true,
            ..Default::default()
        };
        let executor = RecoveryExecutor::new(&store, &dedup, 0.8);

        let issues = vec![
            issue(rules::DUPLICATE_TASKS, Some(RecoveryStrategy::DuplicateRemoval), true, 0.95),
            issue(rules::NEEDS_INTERVENTION, Some(RecoveryStrategy::StatusReset), true, 0.9),
        ];
        let outcome = executor.execute(&ws.id, &issues).await;
        assert_eq!(outcome.issues_resolved, vec![rules::NEEDS_INTERVENTION]);
        assert_eq!(
            outcome.issues_remaining,
            vec![format!("{} (recovery failed)", rules::DUPLICATE_TASKS)]
        );
        assert_eq!(outcome.first_strategy, Some(RecoveryStrategy::StatusReset));
        assert_eq!(
            workspaces::get_by_id(&pool, &ws.id).unwrap().status,
            WorkspaceStatus::Active
        );
    }

    #[tokio::test]
    async fn test_agent_reactivation_flips_only_unavailable_agents() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::Active).unwrap();
        agents::create(&pool, &ws.id, "idle", &AgentStatus::Inactive).unwrap();
        agents::create(&pool, &ws.id, "broken", &AgentStatus::Error).unwrap();
        agents::create(&pool, &ws.id, "ready", &AgentStatus::Available).unwrap();
        let store = SqliteWorkspaceStore::new(pool.clone());
        let dedup = CountingDedup::default();
        let executor = RecoveryExecutor::new(&store, &dedup, 0.8);

        executor
            .apply(&ws.id, RecoveryStrategy::AgentReactivation)
            .await
            .unwrap();

        let statuses: Vec<_> = agents::get_by_workspace(&pool, &ws.id)
            .unwrap()
            .into_iter()
            .map(|a| a.status)
            .collect();
        assert_eq!(
            statuses.iter().filter(|s| **s == AgentStatus::Active).count(),
            2
        );
        assert!(statuses.contains(&AgentStatus::Available));
    }

    #[tokio::test]
    async fn test_agent_reactivation_with_no_agents_succeeds() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::Active).unwrap();
        let store = SqliteWorkspaceStore::new(pool);
        let dedup = CountingDedup::default();
        let executor = RecoveryExecutor::new(&store, &dedup, 0.8);
        assert!(executor
            .apply(&ws.id, RecoveryStrategy::AgentReactivation)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_is_recovery_apply_error() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::Active).unwrap();
        tasks::create(&pool, &ws.id, "t", &TaskStatus::Pending, None).unwrap();
        let store = FlakyStore {
            inner: SqliteWorkspaceStore::new(pool),
        };
        let dedup = CountingDedup::default();
        let executor = RecoveryExecutor::new(&store, &dedup, 0.8);

        let result = executor
            .apply(&ws.id, RecoveryStrategy::AgentReactivation)
            .await;
        assert!(matches!(result, Err(AppError::RecoveryApply(_))));
    }

    #[tokio::test]
    async fn test_unimplemented_strategies_report_unresolved() {
        let pool = init_test_db().unwrap();
        let ws = workspaces::create(&pool, "ws", &WorkspaceStatus::Active).unwrap();
        let store = SqliteWorkspaceStore::new(pool);
        let dedup = CountingDedup::default();
        let executor = RecoveryExecutor::new(&store, &dedup, 0.0);

        for strategy in [
            RecoveryStrategy::AutoCleanup,
            RecoveryStrategy::TaskLimitIncrease,
            RecoveryStrategy::ManualIntervention,
        ] {
            assert!(matches!(
                executor.apply(&ws.id, strategy).await,
                Err(AppError::UnknownStrategy(_))
            ));
        }

        let issues = vec![
            issue("cleanup", Some(RecoveryStrategy::AutoCleanup), true, 1.0),
            issue("manual", Some(RecoveryStrategy::AutoCleanup), false, 0.6),
        ];
        let outcome = executor.execute(&ws.id, &issues).await;
        assert!(outcome.issues_resolved.is_empty());
        assert_eq!(
            outcome.issues_remaining,
            vec!["cleanup (recovery failed)", "manual (manual action required)"]
        );
    }
}
