use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use workspace_health::engine::background::{self, SweepLoopState};
use workspace_health::{db, logging, AppError, HealthConfig, HealthMonitor};

fn main() {
    let _ = dotenvy::dotenv();

    // Initialize Sentry before anything else so panics during startup are captured.
    // Returns a no-op guard when SENTRY_DSN is absent.
    let _sentry_guard = sentry::init(logging::sentry_options());

    logging::init();

    if let Err(e) = run() {
        tracing::error!("workspace-health-daemon failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve())
}

async fn serve() -> Result<(), AppError> {
    let config = HealthConfig::from_env()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database_path.display(),
        auto_recovery = config.enable_auto_recovery,
        interval_secs = config.health_check_interval_seconds,
        "Starting workspace-health-daemon"
    );

    let pool = db::init_db(&config.database_path)?;
    let monitor = Arc::new(HealthMonitor::from_pool(pool, config));
    let state = Arc::new(SweepLoopState::new());
    let cancel = CancellationToken::new();

    let handle = background::start_sweep_loop(state.clone(), monitor, cancel.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    cancel.cancel();
    if let Err(e) = handle.await {
        tracing::error!("Sweep loop panicked: {}", e);
    }

    let stats = state.stats();
    tracing::info!(
        sweeps = stats.sweeps_run,
        checked = stats.workspaces_checked,
        recovered = stats.workspaces_recovered,
        failures = stats.sweep_failures,
        "workspace-health-daemon stopped"
    );
    Ok(())
}
