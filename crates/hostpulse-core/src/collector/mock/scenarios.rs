//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for testing various system conditions.

use super::filesystem::MockFs;
use crate::collector::traits::DiskSpace;

impl MockFs {
    /// Creates a typical Debian host with one ethernet interface.
    ///
    /// Sampling it once yields: 25% CPU (over two `/proc/stat` reads),
    /// ~26.76% memory, 40% disk, 97530864 bytes of non-loopback traffic.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/sys/kernel/hostname", "db-primary\n");
        fs.add_file(
            "/etc/os-release",
            "\
PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"
NAME=\"Debian GNU/Linux\"
VERSION_ID=\"12\"
VERSION=\"12 (bookworm)\"
VERSION_CODENAME=bookworm
ID=debian
HOME_URL=\"https://www.debian.org/\"
",
        );
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );

        // Busy delta 400 of 1600 ticks between the two reads.
        fs.add_file_sequence(
            "/proc/stat",
            [
                "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 5000 250 1500 40000 500 100 50 0 0 0
cpu1 5000 250 1500 40000 500 100 50 0 0 0
ctxt 500000
btime 1700000000
",
                "\
cpu  10300 500 3100 81200 1000 200 100 0 0 0
cpu0 5150 250 1550 40600 500 100 50 0 0 0
cpu1 5150 250 1550 40600 500 100 50 0 0 0
ctxt 501000
btime 1700000000
",
            ],
        );

        fs.add_file(
            "/proc/net/dev",
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
  eth0: 9876543     5678    1    2    0     0          0        10 87654321     4321    3    4    0     0       0          0
",
        );

        fs.set_disk_space(
            "/",
            DiskSpace {
                blocks: 1000,
                blocks_free: 600,
                blocks_available: 600,
            },
        );

        fs
    }

    /// A host where `/proc` is not mounted at all.
    pub fn without_proc() -> Self {
        let mut fs = Self::typical_system();
        for path in [
            "/proc/uptime",
            "/proc/sys/kernel/hostname",
            "/proc/meminfo",
            "/proc/stat",
            "/proc/net/dev",
        ] {
            fs.remove_file(path);
        }
        fs
    }
}
