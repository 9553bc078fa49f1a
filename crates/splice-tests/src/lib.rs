//! Integration test crate for Splice.
//!
//! This crate exists solely to hold cross-module integration tests that
//! drive the timeline, history, editing and player together.

use tracing_subscriber::EnvFilter;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call from every
/// test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod editing;

#[cfg(test)]
mod history;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod timeline;
