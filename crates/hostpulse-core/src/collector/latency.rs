//! Round-trip latency probe against an external HTTP host.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::collector::procfs::CollectError;

/// Measures round-trip latency to some remote endpoint.
pub trait LatencyProbe: Send + Sync {
    /// Performs one probe and returns the wall time it took.
    fn probe(&self) -> impl Future<Output = Result<Duration, CollectError>> + Send;
}

/// Times one plain `GET http://<host>` per probe.
///
/// Any HTTP status counts as success; only transport errors (DNS, connect,
/// timeout) fail the probe. Redirects are followed and included in the time.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
    timeout: Option<Duration>,
}

impl HttpProbe {
    /// Default host probed when none is configured.
    pub const DEFAULT_HOST: &'static str = "google.com";

    /// Builds a probe for `host`. Without a `timeout` a request waits as
    /// long as the remote end keeps the connection open.
    pub fn new(host: &str, timeout: Option<Duration>) -> Result<Self, CollectError> {
        Self::from_builder(reqwest::Client::builder(), host, timeout)
    }

    fn from_builder(
        builder: reqwest::ClientBuilder,
        host: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, CollectError> {
        let builder = match timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };
        let client = builder
            .build()
            .map_err(|e| CollectError::Probe(e.to_string()))?;
        Ok(Self {
            client,
            url: probe_url(host),
            timeout,
        })
    }

    /// URL requested on every probe.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Per-request timeout, `None` when unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl LatencyProbe for HttpProbe {
    async fn probe(&self) -> Result<Duration, CollectError> {
        let start = Instant::now();
        self.client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CollectError::Probe(e.to_string()))?;
        Ok(start.elapsed())
    }
}

/// Accepts a bare host (`example.com`, `10.0.0.1:8080`) or a full URL.
fn probe_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
