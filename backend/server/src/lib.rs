//! # Storage Request Receiver
//!
//! Accepts DNA sample storage requests from the request form.
//!
//!
//!
//! # Endpoints
//! - `POST /api/storage-requests`: multipart body, text fields plus up to three files
//! - `GET /uploads/{name}`: stored files served verbatim
//!
//! ## File Slots
//! - `manifest_file`
//! - `sampling_permits_file`
//! - `nagoya_permits_file`
//!
//! One file per slot. A second file under the same slot is skipped, the first one wins.
//!
//! ## Responses
//! - 200 `{message, data, files}` echoing the text fields and the stored file descriptors
//! - 400 `{error}` for a file under an unknown field name
//! - 500 `{error}` for anything that breaks while parsing or storing
//!
//!
//!
//! # Notes
//!
//! ## Persistence
//! Submissions are logged and echoed, nothing is written to a database. Only the raw
//! files stay behind in the uploads directory.
//!
//! ## CORS
//! Only the form origin may call in, only with `POST` and a `Content-Type` header.
//!
//!
//!
//! # Setup
//!
//! Run with defaults (port 5000, `./uploads`, origin `http://localhost:3000`).
//! ```sh
//! RUST_LOG=info cargo run -p dna_storage
//! ```
//!
//! Override.
//! ```sh
//! PORT=8080 UPLOADS_DIR=/srv/uploads ALLOWED_ORIGIN=https://forms.example.org cargo run -p dna_storage
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::post,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;

use config::Config;
use routes::storage_request_handler;
use state::State;

pub const STORAGE_REQUESTS_PATH: &str = "/api/storage-requests";
pub const UPLOADS_PATH: &str = "/uploads";

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app(state)?)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    Ok(())
}

pub fn app(state: Arc<State>) -> Result<Router> {
    let origin: HeaderValue = state
        .config
        .allowed_origin
        .parse()
        .with_context(|| format!("Invalid origin: {}", state.config.allowed_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let uploads = ServeDir::new(&state.config.uploads_dir);

    Ok(Router::new()
        .route(STORAGE_REQUESTS_PATH, post(storage_request_handler))
        .route(
            &format!("{STORAGE_REQUESTS_PATH}/"),
            post(storage_request_handler),
        )
        .nest_service(UPLOADS_PATH, uploads)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
