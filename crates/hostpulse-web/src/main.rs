mod access_log;
mod handlers;
mod router;
mod state;
mod stream;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use hostpulse_core::collector::{Sampler, SamplerConfig};

use router::{RouterOptions, build_router};
use state::{OriginPolicy, WebAppInner};

// ============================================================
// CLI
// ============================================================

#[derive(Parser, Debug)]
#[command(
    name = "hostpulse-web",
    about = "Streams host telemetry to WebSocket clients",
    version = hostpulse_core::VERSION
)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:8080", env = "HOSTPULSE_LISTEN")]
    listen: SocketAddr,

    /// Seconds between pushes on each stream.
    #[arg(
        long,
        default_value = "1",
        env = "HOSTPULSE_INTERVAL",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval: u64,

    /// Path accepting WebSocket upgrades.
    #[arg(
        long,
        default_value = "/ws",
        env = "HOSTPULSE_WS_PATH",
        value_parser = parse_route_path
    )]
    ws_path: String,

    /// Directory served for every path not handled by the API.
    #[arg(long, default_value = "./static", env = "HOSTPULSE_STATIC_DIR")]
    static_dir: PathBuf,

    /// Host probed with one HTTP GET per sample.
    #[arg(long, default_value = "google.com", env = "HOSTPULSE_PING_HOST")]
    ping_host: String,

    /// Latency probe timeout in seconds. Unbounded when unset.
    #[arg(
        long,
        env = "HOSTPULSE_PING_TIMEOUT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    ping_timeout: Option<u64>,

    /// CPU measurement window in milliseconds.
    #[arg(long, default_value = "1000", env = "HOSTPULSE_CPU_WINDOW_MS")]
    cpu_window_ms: u64,

    /// Path to /proc filesystem.
    #[arg(long, default_value = "/proc", env = "HOSTPULSE_PROC_PATH")]
    proc_path: String,

    /// Origin allowed to open a stream (repeatable). Any origin when unset.
    /// The env var takes a comma-separated list.
    #[arg(
        long = "allowed-origin",
        value_name = "ORIGIN",
        env = "HOSTPULSE_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    allowed_origins: Vec<String>,
}

fn parse_route_path(s: &str) -> Result<String, String> {
    if s.starts_with('/') && s.len() > 1 {
        Ok(s.to_string())
    } else {
        Err(format!("route path must start with '/': {s:?}"))
    }
}

impl Args {
    fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            proc_path: self.proc_path.clone(),
            cpu_window: Duration::from_millis(self.cpu_window_ms),
            ping_host: self.ping_host.clone(),
            ping_timeout: self.ping_timeout.map(Duration::from_secs),
            ..Default::default()
        }
    }
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostpulse_web=info,hostpulse_core=info".into()),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };
    runtime.block_on(async_main(args));
}

async fn async_main(args: Args) {
    info!(version = hostpulse_core::VERSION, "starting");

    let sampler = match Sampler::system(args.sampler_config()) {
        Ok(sampler) => sampler,
        Err(e) => {
            error!(error = %e, "failed to initialize sampler");
            process::exit(1);
        }
    };

    let origin_policy = OriginPolicy::from_allowed(args.allowed_origins.clone());
    match &origin_policy {
        OriginPolicy::Any => info!("accepting streams from any origin"),
        OriginPolicy::AllowList(list) => info!(origins = ?list, "origin allow-list enabled"),
    }

    if !args.static_dir.is_dir() {
        warn!(path = %args.static_dir.display(), "static directory not found; only the API is served");
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let state = Arc::new(WebAppInner::new(
        sampler,
        Duration::from_secs(args.interval),
        origin_policy,
        stop_rx,
    ));

    let app = build_router(
        state,
        &RouterOptions {
            ws_path: args.ws_path.clone(),
            static_dir: args.static_dir.clone(),
        },
    )
    .into_make_service_with_connect_info::<SocketAddr>();

    let listener = match tokio::net::TcpListener::bind(args.listen).await {
        Ok(l) => l,
        Err(e) => {
            error!(addr = %args.listen, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(
        addr = %args.listen,
        ws_path = %args.ws_path,
        interval_secs = args.interval,
        "listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested, closing streams");
            let _ = stop_tx.send(true);
        })
        .await;

    if let Err(e) = served {
        error!(error = %e, "server error");
        process::exit(1);
    }
    info!("stopped");
}
