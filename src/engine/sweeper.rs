//! Fleet sweep over workspaces stuck in `processing_tasks`.

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::db::models::{Workspace, WorkspaceStatus};
use crate::error::AppError;

use super::monitor::HealthMonitor;
use super::types::{FleetSweepSummary, SweepDetail};

impl HealthMonitor {
    /// Check (and auto-recover) every workspace currently in
    /// `processing_tasks`, at most `sweep_concurrency` at a time.
    ///
    /// An empty fleet yields an empty summary. A workspace that fails its
    /// check is recorded as an emergency detail and the sweep continues.
    /// On cancellation, workspaces not yet checked are left out of
    /// `details` and the partial summary is returned.
    pub async fn sweep_stuck_workspaces(
        &self,
        cancel: &CancellationToken,
    ) -> Result<FleetSweepSummary, AppError> {
        let stuck = self
            .store()
            .list_workspaces_by_status(&WorkspaceStatus::ProcessingTasks)
            .await?;

        let mut summary = FleetSweepSummary {
            stuck_count: stuck.len() as u32,
            ..Default::default()
        };
        if stuck.is_empty() {
            tracing::debug!("Sweep found no stuck workspaces");
            return Ok(summary);
        }

        tracing::info!(stuck = stuck.len(), "Sweeping stuck workspaces");

        let concurrency = self.config().sweep_concurrency.max(1);
        let mut results = stream::iter(stuck)
            .map(|ws| self.sweep_one(ws, cancel))
            .buffer_unordered(concurrency);

        while let Some(entry) = results.next().await {
            let Some((id, detail)) = entry else { continue };
            if detail.was_recovered {
                summary.recovered_count += 1;
            }
            summary.details.insert(id, detail);
        }

        if cancel.is_cancelled() {
            tracing::warn!(
                checked = summary.details.len(),
                stuck = summary.stuck_count,
                "Sweep cancelled before completion"
            );
        } else {
            tracing::info!(
                stuck = summary.stuck_count,
                recovered = summary.recovered_count,
                "Sweep complete"
            );
        }
        Ok(summary)
    }

    async fn sweep_one(
        &self,
        ws: Workspace,
        cancel: &CancellationToken,
    ) -> Option<(String, SweepDetail)> {
        if cancel.is_cancelled() {
            return None;
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return None,
            outcome = self.run_check(&ws.id, true) => outcome,
        };

        let detail = match outcome {
            Ok(outcome) => SweepDetail {
                name: ws.name,
                was_recovered: outcome.recovery.as_ref().is_some_and(|r| r.success),
                health_score: outcome.report.overall_score,
                issues_found: outcome.issues_found,
                recovery_attempted: outcome.recovery.is_some(),
            },
            Err(e) => {
                tracing::error!(workspace_id = %ws.id, "Sweep check failed: {}", e);
                SweepDetail {
                    name: ws.name,
                    was_recovered: false,
                    health_score: 0.0,
                    issues_found: 1,
                    recovery_attempted: false,
                }
            }
        };
        Some((ws.id, detail))
    }
}
