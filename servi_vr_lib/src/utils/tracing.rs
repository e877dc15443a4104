//! Centralized tracing initialization for relay binaries and tools.
//!
//! Uses a thread-local subscriber so embedding hosts (tests, future
//! multi-process setups) never fight over the global default.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with thread-local subscriber.
///
/// This function sets up tracing with a thread-local subscriber that:
/// - Respects RUST_LOG environment variable (defaults to "info")
/// - Outputs clean, compact logs without extra metadata
///
/// # Returns
/// A `DefaultGuard` that keeps the subscriber active. The guard must be kept
/// in scope for the duration of the program.
///
/// # Example
/// ```no_run
/// use servi_vr_lib::init_tracing;
///
/// fn main() {
///     let _guard = init_tracing();
///     // Your server code here
/// }
/// ```
pub fn init_tracing() -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}
