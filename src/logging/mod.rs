// Logging module for structured logging using the tracing crate

use std::error::Error;

/// Initialize the tracing subscriber for structured logging
///
/// This function sets up the tracing subscriber that will receive and process
/// log events throughout the application.
///
/// The subscriber is configured with:
/// - Compact formatting for terminal output
/// - Filtering via `RUST_LOG`, defaulting to INFO
/// - Output to stdout
///
/// Calling this more than once (e.g. from tests) leaves the already
/// installed subscriber in place.
///
/// # Examples
///
/// ```
/// use hanko::logging::init_subscriber;
///
/// // Initialize logging at application startup
/// init_subscriber().expect("Failed to initialize logging");
///
/// // Now you can use tracing macros throughout the application
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber() -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init so a second call (common in tests) is not an error
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    Ok(())
}
