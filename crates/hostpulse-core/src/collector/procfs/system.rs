//! System collector for gathering host-wide metrics from `/proc/`.

use crate::collector::procfs::parser::{
    CpuTimes, parse_cpu_times, parse_meminfo, parse_net_dev, parse_os_release_id, parse_uptime,
};
use crate::collector::traits::FileSystem;
use std::path::Path;

/// Interface name the kernel gives the loopback device.
const LOOPBACK: &str = "lo";

/// os-release locations in lookup order, see `os-release(5)`.
const OS_RELEASE_PATHS: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

/// Errors raised by individual collectors.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading a system file.
    Io(std::io::Error),
    /// Parse error in a system file.
    Parse(String),
    /// Network probe failed.
    Probe(String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::Probe(msg) => write!(f, "probe error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// Collects host-wide metrics from `/proc/`.
#[derive(Debug, Clone)]
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn read_proc(&self, name: &str) -> Result<String, CollectError> {
        let path = format!("{}/{}", self.proc_path, name);
        Ok(self.fs.read_to_string(Path::new(&path))?)
    }

    /// Reads aggregate CPU counters from `/proc/stat`.
    pub fn collect_cpu_times(&self) -> Result<CpuTimes, CollectError> {
        let content = self.read_proc("stat")?;
        parse_cpu_times(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Percentage of physical memory in use, from `/proc/meminfo`.
    pub fn collect_memory_usage(&self) -> Result<f64, CollectError> {
        let content = self.read_proc("meminfo")?;
        let info = parse_meminfo(&content).map_err(|e| CollectError::Parse(e.message))?;
        let used = info.mem_total.saturating_sub(info.available());
        Ok(percent(used, info.mem_total))
    }

    /// Bytes received plus transmitted on every non-loopback interface since boot.
    pub fn collect_bandwidth(&self) -> Result<u64, CollectError> {
        let content = self.read_proc("net/dev")?;
        let devices = parse_net_dev(&content).map_err(|e| CollectError::Parse(e.message))?;

        Ok(devices
            .iter()
            .filter(|dev| dev.interface != LOOPBACK)
            .fold(0u64, |acc, dev| {
                acc.saturating_add(dev.rx_bytes)
                    .saturating_add(dev.tx_bytes)
            }))
    }

    /// Percentage used of the filesystem mounted at `mount`.
    ///
    /// Uses the `df` definition: blocks reserved for root count as neither
    /// used nor available.
    pub fn collect_disk_usage(&self, mount: &Path) -> Result<f64, CollectError> {
        let space = self.fs.statvfs(mount)?;
        let used = space.blocks.saturating_sub(space.blocks_free);
        Ok(percent(used, used.saturating_add(space.blocks_available)))
    }

    /// Seconds since boot, from `/proc/uptime`.
    pub fn collect_uptime(&self) -> Result<u64, CollectError> {
        let content = self.read_proc("uptime")?;
        parse_uptime(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Kernel hostname, from `/proc/sys/kernel/hostname`.
    pub fn collect_hostname(&self) -> Result<String, CollectError> {
        let content = self.read_proc("sys/kernel/hostname")?;
        let hostname = content.trim();
        if hostname.is_empty() {
            return Err(CollectError::Parse("empty hostname".into()));
        }
        Ok(hostname.to_string())
    }

    /// Distribution id from the first os-release file present
    /// (`ubuntu`, `debian`, `alpine`, ...).
    pub fn collect_platform(&self) -> Result<String, CollectError> {
        let path = OS_RELEASE_PATHS
            .iter()
            .map(Path::new)
            .find(|p| self.fs.exists(p))
            .ok_or_else(|| CollectError::Parse("no os-release file".into()))?;
        let content = self.fs.read_to_string(path)?;
        parse_os_release_id(&content).map_err(|e| CollectError::Parse(e.message))
    }
}

/// CPU utilization between two `/proc/stat` readings, clamped to `[0, 100]`.
///
/// Returns 0 when the counters did not advance (or went backwards).
pub fn cpu_usage_between(prev: &CpuTimes, cur: &CpuTimes) -> f64 {
    let total = cur.total().saturating_sub(prev.total());
    let idle = cur.idle_total().saturating_sub(prev.idle_total());
    percent(total.saturating_sub(idle), total)
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0)
}
