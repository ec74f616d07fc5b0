mod dispatcher;

pub use dispatcher::{AlertDispatcher, DeliveryId, DispatchError};

use tokio::sync::mpsc;

/// Alerts queued between the pipeline thread and the dispatcher task.
/// The pipeline drops (and logs) when this is full rather than block.
pub const ALERT_QUEUE_DEPTH: usize = 8;

/// Forwarder task that owns the slow outbound calls so the capture loop
/// never waits on the network. Exits when the sending side closes.
pub fn spawn_dispatcher(
    dispatcher: Option<AlertDispatcher>,
    mut alerts: mpsc::Receiver<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = alerts.recv().await {
            match &dispatcher {
                Some(dispatcher) => match dispatcher.send(&message).await {
                    Ok(id) => tracing::info!(delivery = %id, "alert delivered"),
                    // logged, never retried, never pushed back at the pipeline
                    Err(e) => tracing::error!(error = %e, "alert delivery failed"),
                },
                None => {
                    tracing::warn!(message = %message, "no alert webhook configured, alert logged only")
                }
            }
        }
    })
}
