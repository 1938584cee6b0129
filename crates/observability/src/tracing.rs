//! Subscriber construction.

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `fallback` is used. An unparsable `RUST_LOG`
/// also falls back.
pub fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install a JSON formatter with timestamps and without targets.
pub fn init(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(fallback))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
