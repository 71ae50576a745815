//! Collectors for the Linux `/proc` filesystem.
//!
//! This module provides parsers and collectors for reading host-wide
//! information from `/proc` and a handful of files under `/etc`.

pub mod parser;
pub mod system;

pub use system::{CollectError, SystemCollector};
