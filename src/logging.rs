use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with stdout (compact) and Sentry layers.
///
/// - Stdout: human-readable, with file and line for operator consoles
/// - Sentry: captures ERROR events as issues, WARN as breadcrumbs
/// - Default level: INFO for dependencies, DEBUG for this crate; override via RUST_LOG
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,workspace_health=debug"));

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .compact();

    // No-op when Sentry DSN is not configured.
    let sentry_layer = sentry_tracing::layer().event_filter(|meta| match *meta.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    });

    // `try_init` so that a second call (tests, embedding hosts) is harmless.
    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(sentry_layer)
        .try_init();

    if result.is_ok() {
        tracing::debug!("Tracing initialized");
    }
}

/// Sentry client options for the daemon. The DSN is read from `SENTRY_DSN`
/// at runtime; an absent or malformed DSN yields a disabled client.
pub fn sentry_options() -> sentry::ClientOptions {
    sentry::ClientOptions {
        dsn: std::env::var("SENTRY_DSN")
            .ok()
            .and_then(|s| s.trim().parse().ok()),
        release: Some(env!("CARGO_PKG_VERSION").into()),
        traces_sample_rate: 0.0,
        send_default_pii: false,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
        tracing::info!("still logging");
    }

    #[test]
    fn test_sentry_options_carry_release() {
        let opts = sentry_options();
        assert_eq!(opts.release.as_deref(), Some(env!("CARGO_PKG_VERSION")));
        assert!(!opts.send_default_pii);
    }
}
