use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,pulse=debug";

/// Filter from RUST_LOG, or the default when unset
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize structured logging.
/// - JSON lines on stdout
/// - RUST_LOG respected; default to "info,pulse=debug" (covers every `pulse_*` crate)
pub fn init(service_name: &str) {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(service = %service_name, "Observability initialized");
}

/// Like [`init`], but returns false instead of panicking when a subscriber
/// is already installed (tests, embedding)
pub fn try_init(service_name: &str) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(service = %service_name, "Observability initialized");
    }
    installed
}
