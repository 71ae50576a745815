//! Data model for telemetry pushed to stream clients.

mod snapshot;

pub use snapshot::{HostInfo, NetworkInfo, PING_FAILED, Snapshot};
