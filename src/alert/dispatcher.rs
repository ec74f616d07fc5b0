use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Receipt handed back by the notification channel.
#[derive(Debug, Clone)]
pub struct DeliveryId(String);

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
struct Receipt {
    id: String,
}

/// Outbound notification channel: one JSON POST per alert to the
/// configured webhook, which answers with a delivery id.
pub struct AlertDispatcher {
    client: reqwest::Client,
    webhook_url: String,
}

impl AlertDispatcher {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.to_string(),
        }
    }

    /// Deliver one message. Network-bound; called only from the
    /// dispatcher task, never from the pipeline thread.
    pub async fn send(&self, message: &str) -> Result<DeliveryId, DispatchError> {
        let receipt: Receipt = self
            .client
            .post(&self.webhook_url)
            .header("User-Agent", format!("vigil/{}", env!("CARGO_PKG_VERSION")))
            .json(&serde_json::json!({ "text": message }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(DeliveryId(receipt.id))
    }
}
