//! Provider abstraction for snapshot data sources.
//!
//! The stream publisher only needs "something that yields a `Snapshot` when
//! asked". `SnapshotSource` captures that so the publisher can be driven by
//! the real `Sampler` in production and by canned sources in tests.

use std::future::Future;
use std::sync::Arc;

use crate::collector::{FileSystem, InterfaceSource, LatencyProbe, Sampler};
use crate::model::Snapshot;

/// Produces a fresh `Snapshot` per call.
///
/// Implementations must not fail: degraded fields carry their zero values.
pub trait SnapshotSource: Send + Sync + 'static {
    fn snapshot(&self) -> impl Future<Output = Snapshot> + Send;
}

impl<F, I, P> SnapshotSource for Sampler<F, I, P>
where
    F: FileSystem + 'static,
    I: InterfaceSource + 'static,
    P: LatencyProbe + 'static,
{
    fn snapshot(&self) -> impl Future<Output = Snapshot> + Send {
        self.sample()
    }
}

impl<S: SnapshotSource> SnapshotSource for Arc<S> {
    fn snapshot(&self) -> impl Future<Output = Snapshot> + Send {
        (**self).snapshot()
    }
}
