use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rust_embed::Embed;
use serde::Serialize;

use crate::analytics::PipelineStats;
use crate::buffer::FrameBuffer;

use super::mjpeg;

#[derive(Embed)]
#[folder = "src/assets/"]
struct Assets;

#[derive(Clone)]
pub struct AppState {
    pub buffer: FrameBuffer,
    pub stats: Arc<PipelineStats>,
    pub watched_class: String,
    pub stream_interval: Duration,
}

#[derive(Serialize)]
struct StatusResponse {
    frames_processed: u64,
    alerts_fired: u64,
    watched_class: String,
}

pub async fn start_server(state: AppState, addr: std::net::SocketAddr) -> Result<(), std::io::Error> {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/assets/{*path}", get(static_handler))
        .route("/stream", get(stream_handler))
        .route("/api/status", get(status_handler))
        .with_state(state);

    tracing::info!("starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    match Assets::get("index.html") {
        Some(content) => Html(content.data.to_vec()).into_response(),
        None => (StatusCode::NOT_FOUND, "index.html not found").into_response(),
    }
}

async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

async fn stream_handler(State(state): State<AppState>) -> Response {
    mjpeg::stream_response(&state)
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(StatusResponse {
        frames_processed: state.stats.frames_processed.load(Ordering::Relaxed),
        alerts_fired: state.stats.alerts_fired.load(Ordering::Relaxed),
        watched_class: state.watched_class.clone(),
    })
}
