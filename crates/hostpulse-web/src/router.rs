//! Route table and middleware stack.

use std::path::PathBuf;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use hostpulse_core::provider::SnapshotSource;

use crate::access_log::AccessLogLayer;
use crate::handlers;
use crate::state::SharedState;

pub(crate) struct RouterOptions {
    /// Path accepting stream upgrades.
    pub(crate) ws_path: String,
    /// Directory served for every other path.
    pub(crate) static_dir: PathBuf,
}

pub(crate) fn build_router<S: SnapshotSource>(
    state: SharedState<S>,
    options: &RouterOptions,
) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::handle_health))
        .route("/api/v1/snapshot", get(handlers::handle_snapshot::<S>))
        .route(&options.ws_path, get(handlers::handle_stream::<S>))
        .fallback_service(ServeDir::new(&options.static_dir))
        .with_state(state)
        .layer(AccessLogLayer)
        .layer(CorsLayer::permissive())
}
