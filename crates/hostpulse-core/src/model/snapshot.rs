//! Snapshot of host telemetry at a single point in time.
//!
//! A `Snapshot` is assembled once per tick, serialized to JSON, and discarded.
//! Every field is best-effort: a failed query leaves the field at its zero
//! value (`pingLatency` uses `-1`), so the wire format carries no per-field
//! validity flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for `ping_latency` when the probe request failed.
pub const PING_FAILED: f64 = -1.0;

/// Complete telemetry record sent as one stream message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Cumulative bytes received + transmitted on non-loopback interfaces.
    pub bandwidth: u64,
    /// CPU utilization over the measurement window, 0..=100.
    pub cpu_usage: f64,
    /// Physical memory in use, 0..=100.
    pub memory_usage: f64,
    /// Root filesystem used, 0..=100.
    pub disk_usage: f64,
    /// Round-trip of one HTTP GET in milliseconds, or `-1` on failure.
    pub ping_latency: f64,
    /// Wall-clock time the snapshot was assembled (RFC 3339 on the wire).
    pub timestamp: DateTime<Utc>,
    pub host_info: HostInfo,
    pub network_info: NetworkInfo,
}

/// Host identity. Re-queried every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    /// Distribution id from os-release, e.g. `ubuntu`.
    pub platform: String,
    /// `"<os> <arch>"`, e.g. `linux x86_64`.
    pub os: String,
    /// Seconds since boot.
    pub uptime: u64,
}

/// Address pair of the primary network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub ip_address: String,
    pub mac_address: String,
}

impl NetworkInfo {
    /// True when no primary interface was found.
    pub fn is_empty(&self) -> bool {
        self.ip_address.is_empty() && self.mac_address.is_empty()
    }
}
