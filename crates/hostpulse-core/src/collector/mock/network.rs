//! Canned network interfaces and latency probes.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::collector::interfaces::{InterfaceAddrs, InterfaceSource};
use crate::collector::latency::LatencyProbe;
use crate::collector::procfs::CollectError;

/// Fixed interface list, or a listing failure.
#[derive(Debug, Clone, Default)]
pub struct MockInterfaces {
    interfaces: Option<Vec<InterfaceAddrs>>,
}

impl MockInterfaces {
    pub fn new(interfaces: Vec<InterfaceAddrs>) -> Self {
        Self {
            interfaces: Some(interfaces),
        }
    }

    /// Listing always fails.
    pub fn failing() -> Self {
        Self { interfaces: None }
    }

    /// `lo` plus one up ethernet interface `eth0` at 10.0.0.5.
    pub fn typical() -> Self {
        Self::new(vec![
            loopback(),
            InterfaceAddrs {
                name: "eth0".into(),
                is_up: true,
                is_loopback: false,
                ipv4: vec![Ipv4Addr::new(10, 0, 0, 5)],
                mac: Some([0x02, 0x42, 0xac, 0x11, 0x00, 0x02]),
            },
        ])
    }

    /// Only `lo` and a downed `eth0`.
    pub fn loopback_only() -> Self {
        Self::new(vec![
            loopback(),
            InterfaceAddrs {
                name: "eth0".into(),
                is_up: false,
                is_loopback: false,
                ipv4: vec![Ipv4Addr::new(10, 0, 0, 5)],
                mac: Some([0x02, 0x42, 0xac, 0x11, 0x00, 0x02]),
            },
        ])
    }
}

fn loopback() -> InterfaceAddrs {
    InterfaceAddrs {
        name: "lo".into(),
        is_up: true,
        is_loopback: true,
        ipv4: vec![Ipv4Addr::LOCALHOST],
        mac: Some([0; 6]),
    }
}

impl InterfaceSource for MockInterfaces {
    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, CollectError> {
        self.interfaces
            .clone()
            .ok_or_else(|| {
                CollectError::Io(std::io::Error::other("interface listing failed"))
            })
    }
}

/// Latency probe returning a fixed result.
#[derive(Debug, Clone, Copy)]
pub struct FixedLatency {
    rtt: Option<Duration>,
    delay: bool,
}

impl FixedLatency {
    /// Probe succeeding with `rtt`, without actually waiting.
    pub fn ok(rtt: Duration) -> Self {
        Self {
            rtt: Some(rtt),
            delay: false,
        }
    }

    /// Probe that always fails.
    pub fn failing() -> Self {
        Self {
            rtt: None,
            delay: false,
        }
    }

    /// Actually sleep for the reported round-trip.
    pub fn with_delay(mut self) -> Self {
        self.delay = true;
        self
    }
}

impl LatencyProbe for FixedLatency {
    async fn probe(&self) -> Result<Duration, CollectError> {
        let rtt = self
            .rtt
            .ok_or_else(|| CollectError::Probe("host unreachable".into()))?;
        if self.delay {
            tokio::time::sleep(rtt).await;
        }
        Ok(rtt)
    }
}
