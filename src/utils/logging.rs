use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber for host processes that do not bring
/// their own. `RUST_LOG` overrides the default level.
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("playtime_warden=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}
