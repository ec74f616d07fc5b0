use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::buffer::{Frame, FrameBuffer};
use crate::camera::Camera;
use crate::config::DetectionConfig;

use super::aggregator::{AlertSignal, DetectionAggregator};
use super::annotate;
use super::detector::{Detection, ObjectDetector};

const NOT_READY_POLL: Duration = Duration::from_millis(10);

/// Counters shared with the status endpoint. Lock-free so the pipeline
/// never waits on a reader.
#[derive(Default)]
pub struct PipelineStats {
    pub frames_processed: AtomicU64,
    pub alerts_fired: AtomicU64,
}

/// The single producer: capture, detect, annotate, publish, vote.
///
/// Owns the camera, the detector, and the aggregator outright; only the
/// frame buffer and the alert channel are shared. Every per-frame
/// failure is logged and retried, never fatal.
pub struct CapturePipeline {
    camera: Camera,
    detector: ObjectDetector,
    aggregator: DetectionAggregator,
    buffer: FrameBuffer,
    alerts: mpsc::Sender<String>,
    alert_message: String,
    watched_class: String,
    stats: Arc<PipelineStats>,
}

impl CapturePipeline {
    pub fn new(
        camera: Camera,
        detector: ObjectDetector,
        config: &DetectionConfig,
        buffer: FrameBuffer,
        alerts: mpsc::Sender<String>,
        alert_message: String,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            camera,
            detector,
            aggregator: DetectionAggregator::new(config.history_window, config.alert_threshold),
            buffer,
            alerts,
            alert_message,
            watched_class: config.watched_class.clone(),
            stats,
        }
    }

    fn run(mut self, shutdown: Arc<AtomicBool>) {
        tracing::info!(watched = %self.watched_class, "capture pipeline started");

        while !shutdown.load(Ordering::Relaxed) {
            let frame = match self.camera.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    thread::sleep(NOT_READY_POLL);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "camera read failed");
                    thread::sleep(NOT_READY_POLL);
                    continue;
                }
            };

            let detections = match self.detector.detect(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    tracing::warn!(error = %e, "detection failed, skipping frame");
                    continue;
                }
            };

            let mut annotated = frame;
            if let Err(e) = annotate::draw_detections(&mut annotated, &detections, &self.watched_class)
            {
                // a bad overlay is not worth dropping the frame for
                tracing::trace!(error = %e, "annotation failed");
            }

            let published = match Frame::from_mat(&annotated) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "frame copy failed, skipping frame");
                    continue;
                }
            };
            self.buffer.publish(Arc::new(published));
            self.stats.frames_processed.fetch_add(1, Ordering::Relaxed);

            let present = watched_present(&detections, &self.watched_class);
            if self.aggregator.observe(present) == AlertSignal::Triggered {
                self.stats.alerts_fired.fetch_add(1, Ordering::Relaxed);
                tracing::info!(class = %self.watched_class, "alert threshold crossed");

                // hand off to the dispatcher task; a slow or dead
                // notification channel must not stall frame processing
                if let Err(e) = self.alerts.try_send(self.alert_message.clone()) {
                    tracing::warn!(error = %e, "alert queue full, dropping notification");
                }
            }
        }

        tracing::info!("capture pipeline stopped");
    }
}

fn watched_present(detections: &[Detection], watched_class: &str) -> bool {
    detections.iter().any(|d| d.class_name == watched_class)
}

pub fn spawn_pipeline(
    pipeline: CapturePipeline,
    shutdown: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || pipeline.run(shutdown))
}
