//! Workspace health engine.
//!
//! Pure stages (`thresholds`, `rules`, `scoring`, `recovery::plan`) are
//! composed by [`monitor::HealthMonitor`], which talks to the outside world
//! only through [`store::WorkspaceStore`] and [`dedup::Deduplicator`].

pub mod background;
pub mod cache;
pub mod collector;
pub mod dedup;
pub mod monitor;
pub mod recovery;
pub mod rules;
pub mod scoring;
pub mod store;
pub mod sweeper;
pub mod thresholds;
pub mod timestamp;
pub mod types;

pub use monitor::HealthMonitor;
