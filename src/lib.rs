pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;

pub use config::HealthConfig;
pub use engine::cache::ReportCache;
pub use engine::dedup::{Deduplicator, SqliteDeduplicator};
pub use engine::store::{SqliteWorkspaceStore, WorkspaceStore};
pub use engine::types::{
    FleetSweepSummary, HealthIssue, HealthLevel, RecoveryResult, RecoveryStrategy, SweepDetail,
    WorkspaceHealthReport,
};
pub use engine::HealthMonitor;
pub use error::AppError;
