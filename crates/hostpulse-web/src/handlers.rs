//! HTTP request handlers: health, one-shot snapshot, and the stream upgrade.

use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use tracing::warn;

use hostpulse_core::model::Snapshot;
use hostpulse_core::provider::SnapshotSource;

use crate::state::SharedState;
use crate::stream::serve_socket;

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// Snapshot (one-shot)
// ============================================================

/// Samples once and returns the same JSON body a stream message carries.
pub(crate) async fn handle_snapshot<S: SnapshotSource>(
    State(state): State<SharedState<S>>,
) -> Json<Snapshot> {
    Json(state.source.snapshot().await)
}

// ============================================================
// Stream upgrade
// ============================================================

/// Connecting state: validates the origin, then hands the socket to the
/// push loop. Any failure here ends the connection without retry.
pub(crate) async fn handle_stream<S: SnapshotSource>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    if !state.origin_policy.permits(origin) {
        warn!(origin = origin.unwrap_or("-"), "stream upgrade refused: origin not allowed");
        return StatusCode::FORBIDDEN.into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(error = %rejection, "stream upgrade rejected");
            return rejection.into_response();
        }
    };

    ws.on_failed_upgrade(|e| warn!(error = %e, "stream upgrade failed"))
        .on_upgrade(move |socket| serve_socket(socket, state))
}
