//! Host telemetry collection for Linux.
//!
//! This module provides the `Sampler`, which combines several independent
//! probes into one `Snapshot`, with support for mocking for testing on macOS.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Sampler                            │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌────────────┐  │
//! │  │ SystemCollector  │  │ InterfaceSource  │  │ Latency-   │  │
//! │  │ - /proc/stat     │  │ (trait)          │  │ Probe      │  │
//! │  │ - /proc/meminfo  │  │ - getifaddrs     │  │ (trait)    │  │
//! │  │ - /proc/net/dev  │  └──────────────────┘  │ - HTTP GET │  │
//! │  │ - /proc/uptime   │                        └────────────┘  │
//! │  │ - os-release     │                                        │
//! │  │ - statvfs("/")   │                                        │
//! │  └────────┬─────────┘                                        │
//! │    ┌──────▼──────┐                                           │
//! │    │  FileSystem │ (trait)                                   │
//! │    └──────┬──────┘                                           │
//! └───────────┼──────────────────────────────────────────────────┘
//!      ┌──────┴──────┐
//!      │             │
//! ┌────▼────┐   ┌────▼────┐
//! │ RealFs  │   │ MockFs  │
//! └─────────┘   └─────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use hostpulse_core::collector::{Sampler, SamplerConfig};
//!
//! let sampler = Sampler::system(SamplerConfig::default())?;
//! let snapshot = sampler.sample().await;
//! ```
//!
//! ## Testing (with mocks)
//!
//! ```
//! use std::time::Duration;
//! use hostpulse_core::collector::{FixedLatency, MockFs, MockInterfaces, Sampler, SamplerConfig};
//!
//! let sampler = Sampler::new(
//!     MockFs::typical_system(),
//!     MockInterfaces::typical(),
//!     FixedLatency::ok(Duration::from_millis(12)),
//!     SamplerConfig { cpu_window: Duration::ZERO, ..Default::default() },
//! );
//! let snapshot = tokio::runtime::Runtime::new().unwrap().block_on(sampler.sample());
//! assert_eq!(snapshot.ping_latency, 12.0);
//! ```

pub mod interfaces;
pub mod latency;
pub mod mock;
pub mod procfs;
mod sampler;
pub mod traits;

pub use interfaces::{InterfaceAddrs, InterfaceSource, SystemInterfaces, primary_interface};
pub use latency::{HttpProbe, LatencyProbe};
pub use mock::{FixedLatency, MockFs, MockInterfaces};
pub use procfs::{CollectError, SystemCollector};
pub use sampler::{Sampler, SamplerConfig};
pub use traits::{DiskSpace, FileSystem, RealFs};
