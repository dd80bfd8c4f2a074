use tracing_subscriber::{EnvFilter, prelude::*};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to `default_directive`.
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .try_init()
        .is_ok()
}
