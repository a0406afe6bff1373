//! Logging setup via `tracing`.
//!
//! Subsystems emit structured fields (`height`, `txid`, `blob_ref`,
//! `l1_tx_hash`, …); this module owns subscriber configuration so the
//! daemon and tooling initialise it one way.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset: everything at info, with the
/// storage backend quieted down to warnings.
const DEFAULT_FILTER: &str = "info,heed=warn";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter when present.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
