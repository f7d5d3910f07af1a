//! Tracing subscriber setup.

use crate::config::LOG_ENV;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Install a stderr subscriber. Later calls are no-ops.
pub fn init(log_level: Option<&str>) {
    let filter = build_filter(log_level, std::env::var(LOG_ENV).ok());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Explicit level first, then the environment, then `warn`.
fn build_filter(log_level: Option<&str>, env_value: Option<String>) -> EnvFilter {
    log_level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| env_value.and_then(|value| EnvFilter::try_new(value).ok()))
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
