//! Logging utilities for WTS
//!
//! Facade calls emit `tracing` events under the `wts_core` target: `info!`
//! for job lifecycle (open, create, run, save), `debug!` for individual
//! property and trigger calls, `warn!` for a rejected account. These helpers
//! install a subscriber that shows only that target.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Target every event of this crate is recorded under.
pub const TARGET: &str = "wts_core";

/// Filter directive limiting output to this crate at `level`.
pub fn directive(level: &str) -> String {
    format!("{TARGET}={}", level.trim().to_ascii_lowercase())
}

/// `info` for this crate, unless `RUST_LOG` says otherwise.
///
/// ```rust
/// wts_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("info")
}

/// `RUST_LOG` wins when set. Calling this twice is harmless.
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(level)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Debug output for this crate through the test harness writer.
///
/// Safe to call from every test; only the first call installs anything.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(directive("debug")))
        .with_test_writer()
        .without_time()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
