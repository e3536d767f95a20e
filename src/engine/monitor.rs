//! The workspace health controller.
//!
//! `check_health` drives the full pipeline: cache lookup, snapshot
//! collection, issue detection against the dynamic limit, scoring, planning,
//! optional recovery with a cache-bypassing re-check, and finally the cache
//! store.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

use crate::config::HealthConfig;
use crate::db::{format_timestamp, DbPool};
use crate::error::AppError;

use super::cache::ReportCache;
use super::collector::{self, HealthSnapshot};
use super::dedup::{Deduplicator, SqliteDeduplicator};
use super::recovery::{self, RecoveryExecutor};
use super::rules::{self, RuleContext};
use super::scoring;
use super::store::{SqliteWorkspaceStore, WorkspaceStore};
use super::thresholds;
use super::types::{
    HealthIssue, HealthLevel, RecoveryResult, RecoveryStrategy, WorkspaceHealthReport,
};

/// Issue type of the report produced when the workspace record cannot be read.
pub const HEALTH_CHECK_FAILED: &str = "health_check_failed";

/// Recheck delay for unhealthy workspaces, capped by the configured interval.
const UNHEALTHY_RECHECK_SECS: u64 = 60;

/// Result of one pipeline run, with what the sweeper needs to aggregate.
#[derive(Debug, Clone)]
pub(crate) struct CheckOutcome {
    pub report: WorkspaceHealthReport,
    /// Present when recovery was attempted during this run.
    pub recovery: Option<RecoveryResult>,
    /// Issues seen before any recovery.
    pub issues_found: u32,
}

/// Emergency reports are never cached.
struct Assessment {
    report: WorkspaceHealthReport,
    cacheable: bool,
}

pub struct HealthMonitor {
    store: Arc<dyn WorkspaceStore>,
    dedup: Arc<dyn Deduplicator>,
    cache: Arc<ReportCache>,
    config: HealthConfig,
}

impl HealthMonitor {
    pub fn new(
        store: Arc<dyn WorkspaceStore>,
        dedup: Arc<dyn Deduplicator>,
        cache: Arc<ReportCache>,
        config: HealthConfig,
    ) -> Self {
        Self {
            store,
            dedup,
            cache,
            config,
        }
    }

    /// Monitor over the crate's SQLite store and reference deduplicator.
    pub fn from_pool(pool: DbPool, config: HealthConfig) -> Self {
        let cache = Arc::new(ReportCache::new(
            config.report_cache_ttl(),
            config.report_cache_capacity,
        ));
        Self::new(
            Arc::new(SqliteWorkspaceStore::new(pool.clone())),
            Arc::new(SqliteDeduplicator::new(pool)),
            cache,
            config,
        )
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    pub(crate) fn store(&self) -> &dyn WorkspaceStore {
        self.store.as_ref()
    }

    /// Drop the cached report for a workspace mutated out-of-band.
    pub fn invalidate(&self, workspace_id: &str) {
        self.cache.invalidate(workspace_id);
    }

    /// Health report for `workspace_id`, served from cache when fresh.
    ///
    /// When `attempt_auto_recovery` is set, auto recovery is enabled and the
    /// report has auto-recoverable issues, recovery runs and the returned
    /// report reflects the post-recovery state. Fails only with
    /// [`AppError::DataUnavailable`] when the workspace does not exist.
    pub async fn check_health(
        &self,
        workspace_id: &str,
        attempt_auto_recovery: bool,
    ) -> Result<WorkspaceHealthReport, AppError> {
        Ok(self.run_check(workspace_id, attempt_auto_recovery).await?.report)
    }

    pub(crate) async fn run_check(
        &self,
        workspace_id: &str,
        attempt_auto_recovery: bool,
    ) -> Result<CheckOutcome, AppError> {
        if let Some(report) = self.cache.get(workspace_id) {
            tracing::debug!(workspace_id = %workspace_id, "Health report served from cache");
            let issues_found = report.issues.len() as u32;
            return Ok(CheckOutcome {
                report,
                recovery: None,
                issues_found,
            });
        }

        let initial = self.assess(workspace_id).await?;
        let issues_found = initial.report.issues.len() as u32;

        let wants_recovery = attempt_auto_recovery
            && self.config.enable_auto_recovery
            && initial.report.can_auto_recover;
        let (last, recovery) = if wants_recovery {
            let (result, fresh) = self.recover_and_recheck(workspace_id, &initial.report).await?;
            (fresh, Some(result))
        } else {
            (initial, None)
        };

        if last.cacheable {
            self.cache.set(workspace_id, last.report.clone());
        }
        Ok(CheckOutcome {
            report: last.report,
            recovery,
            issues_found,
        })
    }

    /// Attempt recovery for the issues in `report`, then re-check the
    /// workspace without the cache to score the result.
    pub async fn recover(
        &self,
        workspace_id: &str,
        report: &WorkspaceHealthReport,
    ) -> Result<RecoveryResult, AppError> {
        let (result, _) = self.recover_and_recheck(workspace_id, report).await?;
        Ok(result)
    }

    async fn recover_and_recheck(
        &self,
        workspace_id: &str,
        report: &WorkspaceHealthReport,
    ) -> Result<(RecoveryResult, Assessment), AppError> {
        let started = Instant::now();
        tracing::info!(
            workspace_id = %workspace_id,
            issues = report.issues.len(),
            "Starting workspace recovery"
        );

        let executor = RecoveryExecutor::new(
            self.store.as_ref(),
            self.dedup.as_ref(),
            self.config.recovery_confidence_threshold,
        );
        let outcome = executor.execute(workspace_id, &report.issues).await;

        self.cache.invalidate(workspace_id);
        let fresh = self.assess(workspace_id).await?;

        let result = RecoveryResult {
            success: !outcome.issues_resolved.is_empty(),
            strategy_used: outcome
                .first_strategy
                .unwrap_or(RecoveryStrategy::ManualIntervention),
            issues_resolved: outcome.issues_resolved,
            issues_remaining: outcome.issues_remaining,
            new_health_score: fresh.report.overall_score,
            recovery_time_seconds: started.elapsed().as_secs_f64(),
        };

        tracing::info!(
            workspace_id = %workspace_id,
            success = result.success,
            resolved = result.issues_resolved.len(),
            remaining = result.issues_remaining.len(),
            new_score = result.new_health_score,
            "Workspace recovery finished"
        );

        Ok((result, fresh))
    }

    /// Pending-task limit for the workspace. Falls back to the configured
    /// base limit when agents or goals cannot be read.
    pub async fn dynamic_task_limit(&self, workspace_id: &str) -> u32 {
        let agents = self.store.list_agents(workspace_id).await;
        let goals = self.store.list_active_goals(workspace_id).await;
        match (agents, goals) {
            (Ok(agents), Ok(goals)) => thresholds::pending_task_limit(
                self.config.base_task_limit,
                agents.len(),
                goals.len(),
            ),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(
                    workspace_id = %workspace_id,
                    "Falling back to base task limit: {}",
                    e
                );
                self.config.base_task_limit
            }
        }
    }

    /// One uncached pass: collect, detect, score, plan.
    async fn assess(&self, workspace_id: &str) -> Result<Assessment, AppError> {
        let now = Utc::now();
        let log_window = minutes_or_max(self.config.log_window_minutes);

        let snapshot = match collector::collect(self.store.as_ref(), workspace_id, log_window, now)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(AppError::DataUnavailable(what)) => {
                tracing::warn!(workspace_id = %workspace_id, "Workspace not found: {}", what);
                return Err(AppError::DataUnavailable(what));
            }
            Err(e) => {
                tracing::error!(workspace_id = %workspace_id, "Health check failed: {}", e);
                return Ok(Assessment {
                    report: self.emergency_report(workspace_id, &e, now),
                    cacheable: false,
                });
            }
        };

        let ctx = RuleContext {
            pending_task_limit: self.snapshot_task_limit(&snapshot),
            duplicate_task_threshold: self.config.duplicate_task_threshold,
            stuck_after: minutes_or_max(self.config.stuck_after_minutes),
        };
        let issues = rules::detect_issues(&snapshot, &ctx);
        let report = self.build_report(workspace_id, issues, now);

        tracing::debug!(
            workspace_id = %workspace_id,
            score = report.overall_score,
            issues = report.issues.len(),
            healthy = report.is_healthy,
            "Health check complete"
        );
        Ok(Assessment {
            report,
            cacheable: true,
        })
    }

    fn snapshot_task_limit(&self, snapshot: &HealthSnapshot) -> u32 {
        let degraded = snapshot
            .partial_failures
            .iter()
            .any(|c| c == "agents" || c == "goals");
        if degraded {
            return self.config.base_task_limit;
        }
        thresholds::pending_task_limit(
            self.config.base_task_limit,
            snapshot.agents.len(),
            snapshot.active_goals.len(),
        )
    }

    fn build_report(
        &self,
        workspace_id: &str,
        issues: Vec<HealthIssue>,
        now: DateTime<Utc>,
    ) -> WorkspaceHealthReport {
        let overall_score = scoring::health_score(&issues);
        let is_healthy = scoring::is_healthy(overall_score);
        let plan = recovery::plan(&issues);
        WorkspaceHealthReport {
            workspace_id: workspace_id.to_string(),
            is_healthy,
            overall_score,
            recommended_actions: rules::recommended_actions(&issues),
            can_auto_recover: plan.can_auto_recover,
            recovery_strategies: plan.strategies,
            issues,
            last_check_time: format_timestamp(now),
            next_check_recommended: format_timestamp(self.next_check(now, is_healthy)),
        }
    }

    fn emergency_report(
        &self,
        workspace_id: &str,
        error: &AppError,
        now: DateTime<Utc>,
    ) -> WorkspaceHealthReport {
        let issue = HealthIssue {
            level: HealthLevel::Emergency,
            issue_type: HEALTH_CHECK_FAILED.into(),
            description: format!("Health check failed: {error}"),
            affected_count: 1,
            suggested_recovery: Some(RecoveryStrategy::ManualIntervention),
            auto_recoverable: false,
            recovery_confidence: 0.0,
        };
        WorkspaceHealthReport {
            workspace_id: workspace_id.to_string(),
            is_healthy: false,
            overall_score: 0.0,
            recommended_actions: vec![
                "Investigate the workspace store; the workspace record could not be read".into(),
            ],
            can_auto_recover: false,
            recovery_strategies: vec![RecoveryStrategy::ManualIntervention],
            issues: vec![issue],
            last_check_time: format_timestamp(now),
            next_check_recommended: format_timestamp(self.next_check(now, false)),
        }
    }

    fn next_check(&self, now: DateTime<Utc>, healthy: bool) -> DateTime<Utc> {
        let interval = self.config.health_check_interval_seconds;
        let secs = if healthy {
            interval
        } else {
            interval.min(UNHEALTHY_RECHECK_SECS)
        };
        i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Out-of-range minute counts saturate instead of panicking.
fn minutes_or_max(minutes: i64) -> Duration {
    Duration::try_minutes(minutes).unwrap_or(Duration::MAX)
}
