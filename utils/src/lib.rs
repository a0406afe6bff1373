//! Shared utilities for the Fontana rollup.

pub mod logging;

pub use logging::init_tracing;
