//! Test utilities for Statica: tree builders, type fixtures, rewrite
//! shortcuts and an evaluator for checking runtime behavior.

pub mod builders;
pub mod evaluator;
pub mod rewrite;

pub use evaluator::{Evaluator, Value};

use tracing_subscriber::EnvFilter;

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
