pub mod api; // HTTP surface: analyze + artifact downloads
pub mod config; // Settings from the environment
pub mod pipeline; // Five-stage policy risk pipeline

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber. `RUST_LOG` overrides the default filter.
/// Calling it twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
