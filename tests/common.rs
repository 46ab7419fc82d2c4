// tests/common.rs
//! Log capture for integration tests

#[cfg(feature = "logging")]
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route `tracing` output through the test harness, filtered by `RUST_LOG`.
/// Every test calls this first; only the first call installs anything.
pub fn setup() {
    #[cfg(feature = "logging")]
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
