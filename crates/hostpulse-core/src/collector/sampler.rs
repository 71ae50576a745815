//! Assembles one `Snapshot` from all sub-collectors.
//!
//! Every sub-query is independent: a failure is logged at `debug` and the
//! field falls back to its zero value (`-1` for ping), so a sample always
//! completes. The CPU measurement window and the latency probe are awaited
//! concurrently; everything else is a quick file read.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::collector::interfaces::{InterfaceSource, SystemInterfaces, primary_interface};
use crate::collector::latency::{HttpProbe, LatencyProbe};
use crate::collector::procfs::system::cpu_usage_between;
use crate::collector::procfs::{CollectError, SystemCollector};
use crate::collector::traits::{FileSystem, RealFs};
use crate::model::{HostInfo, NetworkInfo, PING_FAILED, Snapshot};

/// Tunables for a `Sampler`.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Base path to proc filesystem.
    pub proc_path: String,
    /// Mount point whose usage is reported as `diskUsage`.
    pub disk_mount: PathBuf,
    /// Window between the two `/proc/stat` reads.
    pub cpu_window: Duration,
    /// Host (or URL) probed for `pingLatency`.
    pub ping_host: String,
    /// Per-request timeout of the latency probe; unbounded when `None`.
    pub ping_timeout: Option<Duration>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            proc_path: "/proc".into(),
            disk_mount: PathBuf::from("/"),
            cpu_window: Duration::from_secs(1),
            ping_host: HttpProbe::DEFAULT_HOST.into(),
            ping_timeout: None,
        }
    }
}

/// Samples host telemetry into `Snapshot`s.
pub struct Sampler<F: FileSystem, I: InterfaceSource, P: LatencyProbe> {
    system: SystemCollector<F>,
    interfaces: I,
    probe: P,
    disk_mount: PathBuf,
    cpu_window: Duration,
}

impl Sampler<RealFs, SystemInterfaces, HttpProbe> {
    /// Sampler reading the running host.
    pub fn system(config: SamplerConfig) -> Result<Self, CollectError> {
        let probe = HttpProbe::new(&config.ping_host, config.ping_timeout)?;
        debug!(url = probe.url(), timeout = ?probe.timeout(), "latency probe configured");
        Ok(Self::new(RealFs::new(), SystemInterfaces, probe, config))
    }
}

impl<F: FileSystem, I: InterfaceSource, P: LatencyProbe> Sampler<F, I, P> {
    /// Creates a sampler over explicit sources.
    ///
    /// `config.ping_host` and `config.ping_timeout` are ignored here; they
    /// only matter when the probe is built by `Sampler::system`.
    pub fn new(fs: F, interfaces: I, probe: P, config: SamplerConfig) -> Self {
        Self {
            system: SystemCollector::new(fs, config.proc_path),
            interfaces,
            probe,
            disk_mount: config.disk_mount,
            cpu_window: config.cpu_window,
        }
    }

    /// Takes one snapshot. Never fails; see module docs.
    pub async fn sample(&self) -> Snapshot {
        let (cpu_usage, ping_latency) = tokio::join!(self.cpu_usage(), self.ping_latency());

        Snapshot {
            bandwidth: or_default("bandwidth", self.system.collect_bandwidth()),
            cpu_usage,
            memory_usage: or_default("memory usage", self.system.collect_memory_usage()),
            disk_usage: or_default(
                "disk usage",
                self.system.collect_disk_usage(&self.disk_mount),
            ),
            ping_latency,
            timestamp: Utc::now(),
            host_info: self.host_info(),
            network_info: self.network_info(),
        }
    }

    /// Utilization over `cpu_window`; the caller is delayed for the window.
    async fn cpu_usage(&self) -> f64 {
        let prev = match self.system.collect_cpu_times() {
            Ok(t) => t,
            Err(e) => {
                debug!(error = %e, "cpu usage unavailable");
                return 0.0;
            }
        };
        tokio::time::sleep(self.cpu_window).await;
        match self.system.collect_cpu_times() {
            Ok(cur) => cpu_usage_between(&prev, &cur),
            Err(e) => {
                debug!(error = %e, "cpu usage unavailable");
                0.0
            }
        }
    }

    async fn ping_latency(&self) -> f64 {
        match self.probe.probe().await {
            Ok(rtt) => rtt.as_millis() as f64,
            Err(e) => {
                debug!(error = %e, "latency probe failed");
                PING_FAILED
            }
        }
    }

    fn host_info(&self) -> HostInfo {
        HostInfo {
            hostname: or_default("hostname", self.system.collect_hostname()),
            platform: or_default("platform", self.system.collect_platform()),
            os: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            uptime: or_default("uptime", self.system.collect_uptime()),
        }
    }

    fn network_info(&self) -> NetworkInfo {
        match self.interfaces.interfaces() {
            Ok(list) => primary_interface(&list),
            Err(e) => {
                debug!(error = %e, "interface listing unavailable");
                NetworkInfo::default()
            }
        }
    }
}

fn or_default<T: Default>(what: &str, result: Result<T, CollectError>) -> T {
    result.unwrap_or_else(|e| {
        debug!(field = what, error = %e, "sub-query failed, using default");
        T::default()
    })
}
