//! HttpSender - POSTs batches as a JSON array

use std::time::Duration;

use contracts::{NetworkSender, SendFailure, WireEvent};
use tracing::{instrument, warn};

use super::classify_status;
use crate::DispatcherError;

/// Sender for the remote collection endpoint
#[derive(Debug, Clone)]
pub struct HttpSender {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSender {
    /// Create a sender with a per-request timeout
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatcherError::sender_creation(&name, e.to_string()))?;
        Ok(Self {
            name,
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl NetworkSender for HttpSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_sender_send",
        skip(self, batch),
        fields(sender = %self.name, size = batch.len())
    )]
    async fn send(&self, batch: &[WireEvent]) -> Result<(), SendFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(batch)
            .send()
            .await
            .map_err(|e| {
                warn!(sender = %self.name, error = %e, "Transport error");
                SendFailure::transient(e.to_string())
            })?;

        classify_status(response.status().as_u16())
    }
}
