//! hostpulse-core: host telemetry sampling for the hostpulse stream server.
//!
//! Provides:
//! - `collector`: `/proc`, statvfs, interface and latency probes, and the `Sampler`
//! - `model`: the JSON-serializable `Snapshot` pushed to clients
//! - `provider`: the `SnapshotSource` abstraction the publisher depends on

pub mod collector;
pub mod model;
pub mod provider;

/// Crate version with the short git SHA it was built from.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("HOSTPULSE_GIT_SHA"),
    ")"
);
