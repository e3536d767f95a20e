//! Controller configuration.
//!
//! Values come from `WORKSPACE_HEALTH_*` environment variables (the daemon
//! loads `.env` first via `dotenvy`). Unparsable values are logged and fall
//! back to their defaults rather than failing startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const ENV_PREFIX: &str = "WORKSPACE_HEALTH_";

/// Upper bound for `health_check_interval_seconds` (one day).
pub const MAX_CHECK_INTERVAL_SECONDS: u64 = 24 * 60 * 60;
/// Upper bound for the minute-valued windows (one week).
pub const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Master switch for automatic remediation during `check_health`.
    pub enable_auto_recovery: bool,
    /// Period of the background sweep loop.
    pub health_check_interval_seconds: u64,
    /// Minimum confidence for a strategy to be applied automatically.
    pub recovery_confidence_threshold: f64,
    /// Base for the dynamic pending-task limit.
    pub base_task_limit: u32,
    /// Reserved. Not used by the current threshold formula.
    pub task_limit_multiplier: f64,
    /// Open tasks sharing a name beyond this count are duplicates.
    pub duplicate_task_threshold: u32,
    pub report_cache_ttl_seconds: u64,
    pub report_cache_capacity: usize,
    /// Workspaces checked concurrently during a fleet sweep. 1 = sequential.
    pub sweep_concurrency: usize,
    /// Idle time after which a `processing_tasks` workspace counts as stuck.
    pub stuck_after_minutes: i64,
    /// Trailing window of activity logs collected per check.
    pub log_window_minutes: i64,
    pub database_path: PathBuf,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enable_auto_recovery: true,
            health_check_interval_seconds: 300,
            recovery_confidence_threshold: 0.8,
            base_task_limit: 200,
            task_limit_multiplier: 1.5,
            duplicate_task_threshold: 3,
            report_cache_ttl_seconds: 60,
            report_cache_capacity: 1024,
            sweep_concurrency: 1,
            stuck_after_minutes: 10,
            log_window_minutes: 60,
            database_path: PathBuf::from("workspace_health.db"),
        }
    }
}

impl HealthConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. The lookup receives the
    /// full prefixed name, e.g. `WORKSPACE_HEALTH_BASE_TASK_LIMIT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let config = Self {
            enable_auto_recovery: parse_bool_or(
                get("ENABLE_AUTO_RECOVERY"),
                "ENABLE_AUTO_RECOVERY",
                defaults.enable_auto_recovery,
            ),
            health_check_interval_seconds: parse_or(
                get("HEALTH_CHECK_INTERVAL_SECONDS"),
                "HEALTH_CHECK_INTERVAL_SECONDS",
                defaults.health_check_interval_seconds,
            ),
            recovery_confidence_threshold: parse_or(
                get("RECOVERY_CONFIDENCE_THRESHOLD"),
                "RECOVERY_CONFIDENCE_THRESHOLD",
                defaults.recovery_confidence_threshold,
            ),
            base_task_limit: parse_or(
                get("BASE_TASK_LIMIT"),
                "BASE_TASK_LIMIT",
                defaults.base_task_limit,
            ),
            task_limit_multiplier: parse_or(
                get("TASK_LIMIT_MULTIPLIER"),
                "TASK_LIMIT_MULTIPLIER",
                defaults.task_limit_multiplier,
            ),
            duplicate_task_threshold: parse_or(
                get("DUPLICATE_TASK_THRESHOLD"),
                "DUPLICATE_TASK_THRESHOLD",
                defaults.duplicate_task_threshold,
            ),
            report_cache_ttl_seconds: parse_or(
                get("REPORT_CACHE_TTL_SECONDS"),
                "REPORT_CACHE_TTL_SECONDS",
                defaults.report_cache_ttl_seconds,
            ),
            report_cache_capacity: parse_or(
                get("REPORT_CACHE_CAPACITY"),
                "REPORT_CACHE_CAPACITY",
                defaults.report_cache_capacity,
            ),
            sweep_concurrency: parse_or(
                get("SWEEP_CONCURRENCY"),
                "SWEEP_CONCURRENCY",
                defaults.sweep_concurrency,
            ),
            stuck_after_minutes: parse_or(
                get("STUCK_AFTER_MINUTES"),
                "STUCK_AFTER_MINUTES",
                defaults.stuck_after_minutes,
            ),
            log_window_minutes: parse_or(
                get("LOG_WINDOW_MINUTES"),
                "LOG_WINDOW_MINUTES",
                defaults.log_window_minutes,
            ),
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=1.0).contains(&self.recovery_confidence_threshold) {
            return Err(AppError::Validation(format!(
                "recovery_confidence_threshold must be within [0, 1], got {}",
                self.recovery_confidence_threshold
            )));
        }
        if !(1..=MAX_CHECK_INTERVAL_SECONDS).contains(&self.health_check_interval_seconds) {
            return Err(AppError::Validation(format!(
                "health_check_interval_seconds must be within [1, {MAX_CHECK_INTERVAL_SECONDS}], got {}",
                self.health_check_interval_seconds
            )));
        }
        if self.sweep_concurrency == 0 {
            return Err(AppError::Validation(
                "sweep_concurrency must be at least 1".into(),
            ));
        }
        if self.report_cache_capacity == 0 {
            return Err(AppError::Validation(
                "report_cache_capacity must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("stuck_after_minutes", self.stuck_after_minutes),
            ("log_window_minutes", self.log_window_minutes),
        ] {
            if !(1..=MAX_WINDOW_MINUTES).contains(&value) {
                return Err(AppError::Validation(format!(
                    "{name} must be within [1, {MAX_WINDOW_MINUTES}], got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }

    pub fn report_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.report_cache_ttl_seconds)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &str, default: T) -> T {
    match raw {
        None => default,
        Some(value) => match value.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key = %name, value = %value, "Unparsable config value, using default");
                default
            }
        },
    }
}

fn parse_bool_or(raw: Option<String>, name: &str, default: bool) -> bool {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => default,
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        Some(other) => {
            tracing::warn!(key = %name, value = %other, "Unparsable boolean config value, using default");
            default
        }
    }
}
