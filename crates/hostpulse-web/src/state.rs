//! Shared application state, connection accounting, and origin policy.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

/// Which browser origins may open a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum OriginPolicy {
    /// Accept every origin.
    #[default]
    Any,
    /// Accept only the listed origins (`scheme://host[:port]`), compared
    /// case-insensitively. Requests without an `Origin` header are accepted:
    /// only browsers send it, and they always do.
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// An empty list means "any origin".
    pub(crate) fn from_allowed(origins: Vec<String>) -> Self {
        let origins: Vec<String> = origins
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_owned())
            .filter(|o| !o.is_empty())
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            OriginPolicy::Any
        } else {
            OriginPolicy::AllowList(origins)
        }
    }

    pub(crate) fn permits(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (OriginPolicy::Any, _) | (OriginPolicy::AllowList(_), None) => true,
            (OriginPolicy::AllowList(list), Some(origin)) => {
                list.iter().any(|allowed| allowed.eq_ignore_ascii_case(origin))
            }
        }
    }
}

pub(crate) struct WebAppInner<S> {
    /// Snapshot source; each connection calls it independently.
    pub(crate) source: S,
    /// Nominal period between pushes.
    pub(crate) interval: Duration,
    pub(crate) origin_policy: OriginPolicy,
    /// Flips to `true` when the server is shutting down.
    pub(crate) shutdown: watch::Receiver<bool>,
    /// Streams currently in the Streaming state.
    pub(crate) active_streams: AtomicUsize,
    /// Streams ever accepted, used as a connection id in logs.
    pub(crate) accepted_streams: AtomicU64,
}

impl<S> WebAppInner<S> {
    pub(crate) fn new(
        source: S,
        interval: Duration,
        origin_policy: OriginPolicy,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            interval,
            origin_policy,
            shutdown,
            active_streams: AtomicUsize::new(0),
            accepted_streams: AtomicU64::new(0),
        }
    }

    pub(crate) fn active_streams(&self) -> usize {
        self.active_streams.load(Ordering::Relaxed)
    }
}

pub(crate) type SharedState<S> = Arc<WebAppInner<S>>;

/// Counts a stream as active for as long as it is alive.
pub(crate) struct StreamGuard<S> {
    state: SharedState<S>,
    pub(crate) id: u64,
}

impl<S> StreamGuard<S> {
    pub(crate) fn register(state: SharedState<S>) -> Self {
        let id = state.accepted_streams.fetch_add(1, Ordering::Relaxed) + 1;
        let active = state.active_streams.fetch_add(1, Ordering::Relaxed) + 1;
        info!(stream_id = id, active_streams = active, "stream client connected");
        Self { state, id }
    }
}

impl<S> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        let active = self.state.active_streams.fetch_sub(1, Ordering::Relaxed) - 1;
        info!(
            stream_id = self.id,
            active_streams = active,
            "stream client disconnected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_policy_any() {
        let policy = OriginPolicy::from_allowed(vec![]);
        assert_eq!(policy, OriginPolicy::Any);
        assert!(policy.permits(Some("https://evil.example")));
        assert!(policy.permits(None));

        assert_eq!(
            OriginPolicy::from_allowed(vec!["*".into()]),
            OriginPolicy::Any
        );
    }

    #[test]
    fn test_origin_policy_allow_list() {
        let policy = OriginPolicy::from_allowed(vec![
            "https://dash.example.com/".into(),
            " http://localhost:3000 ".into(),
            "".into(),
        ]);
        assert_eq!(
            policy,
            OriginPolicy::AllowList(vec![
                "https://dash.example.com".into(),
                "http://localhost:3000".into(),
            ])
        );
        assert!(policy.permits(Some("https://dash.example.com")));
        assert!(policy.permits(Some("HTTPS://Dash.Example.com")));
        assert!(policy.permits(Some("http://localhost:3000")));
        assert!(!policy.permits(Some("http://localhost:3001")));
        assert!(!policy.permits(Some("https://evil.example")));
        // Non-browser clients do not send Origin.
        assert!(policy.permits(None));
    }

    #[test]
    fn test_stream_guard_counts() {
        let (_tx, rx) = watch::channel(false);
        let state = Arc::new(WebAppInner::new(
            (),
            Duration::from_secs(1),
            OriginPolicy::Any,
            rx,
        ));

        let a = StreamGuard::register(state.clone());
        let b = StreamGuard::register(state.clone());
        assert_eq!(state.active_streams(), 2);
        assert_eq!((a.id, b.id), (1, 2));

        drop(a);
        assert_eq!(state.active_streams(), 1);
        drop(b);
        assert_eq!(state.active_streams(), 0);

        let c = StreamGuard::register(state.clone());
        assert_eq!(c.id, 3);
    }
}
