//! Test helpers for Ferry server integration tests
//!
//! This module provides utilities for:
//! - Tracing output captured by the test harness
//! - A two-version test connector and its upgraders
//! - Seeding a repository with links and jobs

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

pub mod fixtures;

use std::sync::Once;

// Re-export fixtures for convenience
pub use fixtures::*;

static TRACING: Once = Once::new();

/// Route tracing output through the test writer once per binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ferry_server=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
