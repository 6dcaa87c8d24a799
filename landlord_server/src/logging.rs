//! Structured logging configuration.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,tower_http=warn";

/// Initialize structured logging
///
/// Installs a `tracing` subscriber filtered by the `RUST_LOG` env var. The
/// engine logs through the `log` facade; those records are forwarded into
/// the same subscriber.
///
/// # Example
///
/// ```no_run
/// use landlord_server::logging;
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
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a websocket connection opening or closing
///
/// # Arguments
///
/// * `user_id` - Account id from the connection's query string
/// * `event` - What happened to the connection
pub fn log_connection(user_id: i64, event: &str) {
    tracing::info!(user_id = user_id, event = event, "Connection");
}
