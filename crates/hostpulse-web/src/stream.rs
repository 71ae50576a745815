//! Per-connection snapshot push loop.
//!
//! Each accepted WebSocket gets its own task running `stream_snapshots`:
//! a timer, a read side watched for close, and the server shutdown signal.
//! On every tick the source is sampled and the snapshot is written as one
//! JSON text frame. Nothing is shared between connections except the
//! active-stream gauge.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use hostpulse_core::provider::SnapshotSource;

use crate::state::{SharedState, StreamGuard};

/// Why a stream left the Streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseReason {
    /// Close frame, read error, or end of stream from the client.
    ClientClosed,
    /// Writing a snapshot failed.
    WriteFailed,
    /// The server is shutting down.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StreamOutcome {
    pub(crate) reason: CloseReason,
    /// Snapshots successfully written.
    pub(crate) sent: u64,
}

/// Runs the Streaming state for an upgraded socket until it closes.
pub(crate) async fn serve_socket<S: SnapshotSource>(socket: WebSocket, state: SharedState<S>) {
    let guard = StreamGuard::register(state.clone());
    let started = Instant::now();
    let (tx, rx) = socket.split();

    let outcome = stream_snapshots(
        &state.source,
        tx,
        rx,
        state.interval,
        state.shutdown.clone(),
    )
    .await;

    info!(
        stream_id = guard.id,
        reason = ?outcome.reason,
        sent = outcome.sent,
        duration_ms = started.elapsed().as_millis() as u64,
        "stream closed"
    );
}

/// Pushes one snapshot per `interval` into `tx` until the client goes away,
/// a write fails, or `shutdown` turns `true`.
///
/// The first push happens one full interval after entry. Closure is only
/// observed between ticks: a sample in progress always runs to completion.
/// Ticks missed while sampling are delayed, never burst.
pub(crate) async fn stream_snapshots<S, Tx, Rx, E>(
    source: &S,
    mut tx: Tx,
    mut rx: Rx,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> StreamOutcome
where
    S: SnapshotSource,
    Tx: Sink<Message> + Unpin,
    Tx::Error: Display,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut tick = tokio::time::interval_at(Instant::now() + interval, interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent: u64 = 0;

    let reason = loop {
        tokio::select! {
            // Closure wins over a due tick: once it is seen, nothing more is written.
            biased;

            // The borrow guard is dropped inside the branch so the loop future stays Send.
            _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                break CloseReason::Shutdown;
            }
            msg = rx.next() => match msg {
                None | Some(Ok(Message::Close(_))) => break CloseReason::ClientClosed,
                Some(Err(e)) => {
                    debug!(error = %e, "stream read failed");
                    break CloseReason::ClientClosed;
                }
                // Pings are answered by the socket itself; anything else is ignored.
                Some(Ok(_)) => {}
            },
            _ = tick.tick() => {
                let t0 = Instant::now();
                let snapshot = source.snapshot().await;
                let json = match serde_json::to_string(&snapshot) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(error = %e, "failed to serialize snapshot");
                        continue;
                    }
                };
                if let Err(e) = tx.send(Message::Text(json.into())).await {
                    warn!(error = %e, "failed to write snapshot");
                    break CloseReason::WriteFailed;
                }
                sent += 1;
                debug!(
                    sample_ms = t0.elapsed().as_millis() as u64,
                    sent,
                    "snapshot pushed"
                );
            }
        }
    };

    // Best effort: let a still-connected peer see an orderly close.
    if reason == CloseReason::Shutdown {
        let _ = tx.send(Message::Close(None)).await;
    }

    StreamOutcome { reason, sent }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use hostpulse_core::model::{HostInfo, NetworkInfo, Snapshot};
    use tokio::sync::mpsc;

    /// Source returning a snapshot whose `bandwidth` counts its own calls.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicU64,
        delay: Duration,
    }

    impl SnapshotSource for CountingSource {
        async fn snapshot(&self) -> Snapshot {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Snapshot {
                bandwidth: n,
                cpu_usage: 1.0,
                memory_usage: 2.0,
                disk_usage: 3.0,
                ping_latency: -1.0,
                timestamp: Utc::now(),
                host_info: HostInfo::default(),
                network_info: NetworkInfo::default(),
            }
        }
    }

    type Written = Arc<Mutex<Vec<Message>>>;

    /// Sink recording every frame; fails once `fail_after` frames were written.
    fn recording_sink(
        written: Written,
        fail_after: Option<usize>,
    ) -> impl Sink<Message, Error = String> + Unpin {
        Box::pin(futures_util::sink::unfold(
            written,
            move |written, msg: Message| async move {
                {
                    let mut w = written.lock().unwrap();
                    if fail_after.is_some_and(|n| w.len() >= n) {
                        return Err("broken pipe".to_string());
                    }
                    w.push(msg);
                }
                Ok(written)
            },
        ))
    }

    /// Client read side driven by a channel; dropping the sender ends it.
    fn client_stream(
        rx: mpsc::UnboundedReceiver<Result<Message, Infallible>>,
    ) -> impl Stream<Item = Result<Message, Infallible>> + Unpin {
        Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|m| (m, rx))
        }))
    }

    fn texts(written: &Written) -> Vec<Snapshot> {
        written
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| match m {
                Message::Text(t) => Some(serde_json::from_str(t.as_str()).unwrap()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_disconnect_after_three_and_a_half_ticks() {
        let source = Arc::new(CountingSource::default());
        let written: Written = Arc::default();
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn({
            let source = source.clone();
            let sink = recording_sink(written.clone(), None);
            async move {
                stream_snapshots(
                    &source,
                    sink,
                    client_stream(client_rx),
                    Duration::from_secs(1),
                    stop_rx,
                )
                .await
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        drop(client_tx);
        let outcome = task.await.unwrap();

        assert_eq!(outcome.reason, CloseReason::ClientClosed);
        assert_eq!(outcome.sent, 3);
        let snaps = texts(&written);
        assert_eq!(
            snaps.iter().map(|s| s.bandwidth).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        // Nothing is written after the loop ended.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(written.lock().unwrap().len(), 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_frame_ends_stream() {
        let source = CountingSource::default();
        let written: Written = Arc::default();
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        client_tx.send(Ok(Message::Close(None))).unwrap();
        let outcome = stream_snapshots(
            &source,
            recording_sink(written.clone(), None),
            client_stream(client_rx),
            Duration::from_secs(1),
            stop_rx,
        )
        .await;

        assert_eq!(outcome.reason, CloseReason::ClientClosed);
        assert_eq!(outcome.sent, 0);
        assert!(written.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_messages_are_ignored() {
        let source = CountingSource::default();
        let written: Written = Arc::default();
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let driver = async {
            client_tx.send(Ok(Message::Text("hello".into()))).unwrap();
            tokio::time::sleep(Duration::from_millis(1500)).await;
            client_tx.send(Ok(Message::Ping(vec![1].into()))).unwrap();
            tokio::time::sleep(Duration::from_millis(1000)).await;
            client_tx.send(Ok(Message::Close(None))).unwrap();
        };
        let (outcome, ()) = tokio::join!(
            stream_snapshots(
                &source,
                recording_sink(written.clone(), None),
                client_stream(client_rx),
                Duration::from_secs(1),
                stop_rx,
            ),
            driver
        );

        assert_eq!(outcome.reason, CloseReason::ClientClosed);
        assert_eq!(outcome.sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_ends_stream() {
        let source = CountingSource::default();
        let written: Written = Arc::default();
        let (_client_tx, client_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let outcome = stream_snapshots(
            &source,
            recording_sink(written.clone(), Some(2)),
            client_stream(client_rx),
            Duration::from_secs(1),
            stop_rx,
        )
        .await;

        assert_eq!(outcome.reason, CloseReason::WriteFailed);
        assert_eq!(outcome.sent, 2);
        // The third sample was taken, its write failed, and no retry followed.
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_signal_ends_stream() {
        let source = CountingSource::default();
        let written: Written = Arc::default();
        let (_client_tx, client_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let driver = async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            stop_tx.send(true).unwrap();
        };
        let (outcome, ()) = tokio::join!(
            stream_snapshots(
                &source,
                recording_sink(written.clone(), None),
                client_stream(client_rx),
                Duration::from_secs(1),
                stop_rx,
            ),
            driver
        );

        assert_eq!(outcome.reason, CloseReason::Shutdown);
        assert_eq!(outcome.sent, 2);
        let last = written.lock().unwrap().last().cloned();
        assert!(matches!(last, Some(Message::Close(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sample_stretches_cadence() {
        // Sampling takes longer than the timer period: pushes are spaced by
        // the sample time and the client close is seen only after the
        // in-flight sample is written.
        let source = CountingSource {
            delay: Duration::from_millis(1500),
            ..Default::default()
        };
        let written: Written = Arc::default();
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let driver = async {
            tokio::time::sleep(Duration::from_millis(6000)).await;
            drop(client_tx);
        };
        let (outcome, ()) = tokio::join!(
            stream_snapshots(
                &source,
                recording_sink(written.clone(), None),
                client_stream(client_rx),
                Duration::from_secs(1),
                stop_rx,
            ),
            driver
        );

        // Pushes land at t=2.5, 4.0, 5.5 and 7.0.
        assert_eq!(outcome.reason, CloseReason::ClientClosed);
        assert_eq!(outcome.sent, 4);
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_streams_are_independent() {
        let source = Arc::new(CountingSource::default());
        let written_a: Written = Arc::default();
        let written_b: Written = Arc::default();
        let (client_a, rx_a) = mpsc::unbounded_channel();
        let (client_b, rx_b) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let a = tokio::spawn({
            let (source, sink, stop) = (
                source.clone(),
                recording_sink(written_a.clone(), None),
                stop_rx.clone(),
            );
            async move {
                stream_snapshots(&source, sink, client_stream(rx_a), Duration::from_secs(1), stop)
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        let b = tokio::spawn({
            let (source, sink, stop) = (
                source.clone(),
                recording_sink(written_b.clone(), None),
                stop_rx.clone(),
            );
            async move {
                stream_snapshots(&source, sink, client_stream(rx_b), Duration::from_secs(1), stop)
                    .await
            }
        });

        // Closing A leaves B running.
        tokio::time::sleep(Duration::from_millis(1700)).await; // t = 2.2s
        drop(client_a);
        let outcome_a = a.await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await; // t = 4.2s
        drop(client_b);
        let outcome_b = b.await.unwrap();

        // A: t=1, 2. B started at 0.5: t=1.5, 2.5, 3.5.
        assert_eq!(outcome_a.sent, 2);
        assert_eq!(outcome_b.sent, 3);
        assert_eq!(written_a.lock().unwrap().len(), 2);
        assert_eq!(written_b.lock().unwrap().len(), 3);
        // Every push sampled the source on its own.
        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_stream_future_is_send() {
        let source = CountingSource::default();
        let (_client_tx, client_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let fut = stream_snapshots(
            &source,
            recording_sink(Arc::default(), None),
            client_stream(client_rx),
            Duration::from_secs(1),
            stop_rx,
        );
        // Must stay spawnable while a sample is in flight.
        assert_send(&fut);
    }
}
