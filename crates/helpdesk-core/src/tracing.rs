use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured stdout tracing for a service. Call once at startup.
/// Uses JSON format with env-filter (`RUST_LOG` env var) and records the
/// service name on the startup event.
///
/// Safe to call multiple times — subsequent calls are silently ignored.
pub fn init_tracing(service: &str) {
    let installed = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json())
        .try_init()
        .is_ok();
    if installed {
        ::tracing::info!(service, "tracing initialized");
    }
}
