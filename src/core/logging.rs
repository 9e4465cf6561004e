//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable, e.g. `RUST_LOG=brume=debug`
/// to see per-program registration and broadcast diagnostics.
///
/// # Example
/// ```
/// brume::core::logging::init();
/// log::info!("Fog system starting");
/// ```
pub fn init() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    )
    .format_timestamp_millis()
    .try_init();
}
