use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod alert;
mod analytics;
mod api;
mod buffer;
mod camera;
mod config;

use alert::AlertDispatcher;
use analytics::{CapturePipeline, ObjectDetector, PipelineStats};
use api::AppState;
use buffer::FrameBuffer;
use camera::Camera;
use config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=debug".parse()?))
        .init();

    let config = Config::load()?;
    tracing::info!(
        watched = %config.detection.watched_class,
        window = config.detection.history_window,
        threshold = config.detection.alert_threshold,
        "configuration loaded"
    );

    if !analytics::is_known_class(&config.detection.watched_class) {
        tracing::warn!(
            class = %config.detection.watched_class,
            "watched class is not a label the model emits; alerts will never fire"
        );
    }

    // startup failures here are fatal: no pipeline without a working
    // camera and model
    let camera = Camera::open(&config.camera)?;
    let detector = ObjectDetector::new(&config.detection.model, config.detection.confidence)?;

    let buffer = FrameBuffer::new();
    let stats = Arc::new(PipelineStats::default());
    let shutdown = Arc::new(AtomicBool::new(false));

    let (alert_tx, alert_rx) = mpsc::channel(alert::ALERT_QUEUE_DEPTH);
    let dispatcher = config.alert.webhook.as_deref().map(AlertDispatcher::new);
    let dispatcher_handle = alert::spawn_dispatcher(dispatcher, alert_rx);

    let alert_message = config
        .alert
        .message
        .replace("{class}", &config.detection.watched_class);
    let pipeline = CapturePipeline::new(
        camera,
        detector,
        &config.detection,
        buffer.clone(),
        alert_tx,
        alert_message,
        Arc::clone(&stats),
    );
    let pipeline_handle = analytics::spawn_pipeline(pipeline, Arc::clone(&shutdown));

    let stats_handle = {
        let stats = Arc::clone(&stats);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                interval.tick().await;
                tracing::info!(
                    frames = stats.frames_processed.load(Ordering::Relaxed),
                    alerts = stats.alerts_fired.load(Ordering::Relaxed),
                    "pipeline stats"
                );
            }
        })
    };

    let state = AppState {
        buffer,
        stats,
        watched_class: config.detection.watched_class.clone(),
        stream_interval: Duration::from_millis((1000 / config.camera.fps as u64).max(1)),
    };

    let addr = std::net::SocketAddr::new(config.http.bind, config.http.port);
    let server_result = tokio::select! {
        result = api::start_server(state, addr) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    };

    shutdown.store(true, Ordering::Relaxed);
    if let Err(e) = pipeline_handle.await {
        tracing::error!("pipeline task failed: {}", e);
    }
    stats_handle.abort();
    dispatcher_handle.abort();

    server_result?;
    tracing::info!("shutdown complete");

    Ok(())
}
