use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    access::{Notes, MAX_CIPHERTEXT_LEN},
    handlers::{confirm_view, create_note, get_note, health},
    lifecycle::Lifecycle,
    store::Store,
    AppState,
};

/// Headroom for the JSON envelope around the ciphertext.
const MAX_BODY_BYTES: usize = MAX_CIPHERTEXT_LEN * 2;

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    /// Interval of the background sweep. The opportunistic sweep on each
    /// read runs regardless (unless `sweep_on_read` is off).
    pub sweep_interval: Duration,
    pub sweep_on_read: bool,
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("QUICKNOTE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("QUICKNOTE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            data_dir: std::env::var("QUICKNOTE_DATA_DIR").ok().map(PathBuf::from),
            sweep_interval: Duration::from_secs(300),
            sweep_on_read: true,
            cors_origins: std::env::var("QUICKNOTE_CORS_ORIGINS").ok(),
        }
    }
}

/// Use `explicit` (created if missing) or fall back to the platform data dir.
pub fn resolve_data_dir(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(d) => {
            std::fs::create_dir_all(d).context("create data dir")?;
            Ok(d.clone())
        }
        None => crate::dirs::data_dir(),
    }
}

/// Open the note database under `data_dir` and wire up the engine.
pub fn open_notes(data_dir: &Path, sweep_on_read: bool) -> Result<Notes<Store>> {
    let db_path = data_dir.join("quicknote.db");
    let store = Store::open(&db_path).context("open store")?;
    Ok(Notes::new(Lifecycle::new(store).sweep_on_fetch(sweep_on_read)))
}

pub fn router(state: AppState, cors_origins: Option<&str>) -> Router {
    let api = Router::new()
        .route("/notes", post(create_note))
        .route("/notes/{id}", get(get_note))
        .route("/notes/{id}/views", post(confirm_view));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(build_cors(cors_origins))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let data_dir = resolve_data_dir(cfg.data_dir.as_ref())?;
    info!(data_dir = %data_dir.display(), "using data directory");

    let notes = open_notes(&data_dir, cfg.sweep_on_read)?;

    // Clear out anything that died while the server was down.
    let swept = notes.lifecycle().collect_garbage()?;
    info!(swept, "startup sweep complete");

    let sweeper = notes.lifecycle().spawn_sweep(cfg.sweep_interval);

    let state = AppState { notes };
    let app = router(state, cfg.cors_origins.as_deref());

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, "quicknote server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error");

    sweeper.abort();
    served
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(Any);

    match origins {
        Some(o) => {
            let origins: Vec<HeaderValue> = o
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}
