//! Mock implementations for testing.
//!
//! This module provides `MockFs`, `MockInterfaces` and `FixedLatency` plus
//! pre-built scenarios for testing the sampler without a real Linux host or
//! network access.

mod filesystem;
mod network;
mod scenarios;

pub use filesystem::MockFs;
pub use network::{FixedLatency, MockInterfaces};
