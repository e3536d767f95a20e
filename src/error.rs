use serde::Serialize;

/// Crate-wide error type. Every fallible function returns `Result<T, AppError>`.
/// Serializes cleanly so dashboards and operational tooling get structured error messages.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The workspace record itself could not be loaded. Fatal for a health check.
    #[error("Workspace data unavailable: {0}")]
    DataUnavailable(String),

    /// A secondary collection (tasks, agents, goals, logs) could not be loaded.
    #[error("Partial data error: {0}")]
    PartialData(String),

    /// A recovery strategy's store mutation failed.
    #[error("Recovery failed: {0}")]
    RecoveryApply(String),

    /// A recovery strategy with no execution target.
    #[error("No automated handler for strategy: {0}")]
    UnknownStrategy(String),

    #[error("Deduplication error: {0}")]
    Dedup(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind, used as the `kind` field on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::Pool(_) => "pool",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Io(_) => "io",
            AppError::Serde(_) => "serde",
            AppError::DataUnavailable(_) => "data_unavailable",
            AppError::PartialData(_) => "partial_data",
            AppError::RecoveryApply(_) => "recovery_apply",
            AppError::UnknownStrategy(_) => "unknown_strategy",
            AppError::Dedup(_) => "dedup",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Serialized as `{ error: "...", kind: "..." }` for dashboard consumption.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("error", &self.to_string())?;
        s.serialize_field("kind", self.kind())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_error_and_kind() {
        let err = AppError::DataUnavailable("workspace ws-1".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "data_unavailable");
        assert_eq!(json["error"], "Workspace data unavailable: workspace ws-1");
    }

    #[test]
    fn test_database_error_from_sqlite() {
        let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), "database");
    }
}
