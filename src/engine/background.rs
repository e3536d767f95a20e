use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::monitor::HealthMonitor;

/// Runtime state for the sweep loop, shared across tasks.
pub struct SweepLoopState {
    running: AtomicBool,
    sweeps_run: AtomicU64,
    workspaces_checked: AtomicU64,
    workspaces_recovered: AtomicU64,
    sweep_failures: AtomicU64,
}

impl Default for SweepLoopState {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepLoopState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            sweeps_run: AtomicU64::new(0),
            workspaces_checked: AtomicU64::new(0),
            workspaces_recovered: AtomicU64::new(0),
            sweep_failures: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> SweepLoopStats {
        SweepLoopStats {
            running: self.running.load(Ordering::Relaxed),
            sweeps_run: self.sweeps_run.load(Ordering::Relaxed),
            workspaces_checked: self.workspaces_checked.load(Ordering::Relaxed),
            workspaces_recovered: self.workspaces_recovered.load(Ordering::Relaxed),
            sweep_failures: self.sweep_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepLoopStats {
    pub running: bool,
    pub sweeps_run: u64,
    pub workspaces_checked: u64,
    pub workspaces_recovered: u64,
    pub sweep_failures: u64,
}

/// Start the periodic fleet sweep. Returns immediately; the loop runs until
/// `cancel` fires. The first sweep happens right away.
pub fn start_sweep_loop(
    state: Arc<SweepLoopState>,
    monitor: Arc<HealthMonitor>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    state.running.store(true, Ordering::Relaxed);
    let period = monitor.config().health_check_interval();
    tracing::info!(interval_secs = period.as_secs(), "Sweep loop starting");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            run_sweep(&state, &monitor, &cancel).await;
        }
        state.running.store(false, Ordering::Relaxed);
        tracing::info!("Sweep loop exited");
    })
}

/// One sweep plus cache maintenance, with counters updated.
async fn run_sweep(state: &SweepLoopState, monitor: &HealthMonitor, cancel: &CancellationToken) {
    match monitor.sweep_stuck_workspaces(cancel).await {
        Ok(summary) => {
            state.sweeps_run.fetch_add(1, Ordering::Relaxed);
            state
                .workspaces_checked
                .fetch_add(summary.details.len() as u64, Ordering::Relaxed);
            state
                .workspaces_recovered
                .fetch_add(u64::from(summary.recovered_count), Ordering::Relaxed);
        }
        Err(e) => {
            state.sweep_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!("Fleet sweep failed: {}", e);
        }
    }

    let pruned = monitor.cache().prune_expired();
    if pruned > 0 {
        tracing::debug!(pruned, "Pruned expired health reports");
    }
}
