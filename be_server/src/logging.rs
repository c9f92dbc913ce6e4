//! Structured logging configuration.
//!
//! The bracket engine logs through the `log` facade; the subscriber set up
//! here picks those records up alongside the server's own `tracing` events.

use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Operations slower than this are logged at warn level
pub const SLOW_OPERATION: Duration = Duration::from_millis(500);

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use be_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log how long a bracket operation took
///
/// # Example
///
/// ```
/// use be_server::logging::log_performance;
/// use std::time::Instant;
///
/// let start = Instant::now();
/// // ... do work ...
/// log_performance("generate", start.elapsed(), Some("32 slots"));
/// ```
pub fn log_performance(operation: &str, elapsed: Duration, metadata: Option<&str>) {
    let duration_ms = elapsed.as_millis() as u64;
    if elapsed > SLOW_OPERATION {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}

/// Log a request that ended in an error response
pub fn log_api_error(operation: &str, status_code: u16, message: &str) {
    if status_code >= 500 {
        tracing::error!(
            operation = operation,
            http_status = status_code,
            "API request failed: {}",
            message
        );
    } else {
        tracing::info!(
            operation = operation,
            http_status = status_code,
            "API request rejected: {}",
            message
        );
    }
}
