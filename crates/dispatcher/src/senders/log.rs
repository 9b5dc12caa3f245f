//! LogSender - acknowledges every batch after logging it

use contracts::{NetworkSender, SendFailure, WireEvent};
use tracing::{debug, info, instrument};

/// Sender that logs batch summaries instead of talking to an endpoint
#[derive(Debug, Clone)]
pub struct LogSender {
    name: String,
}

impl LogSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogSender {
    fn default() -> Self {
        Self::new("log")
    }
}

impl NetworkSender for LogSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sender_send",
        skip(self, batch),
        fields(sender = %self.name, size = batch.len())
    )]
    async fn send(&self, batch: &[WireEvent]) -> Result<(), SendFailure> {
        for event in batch {
            debug!(
                id = %event.id(),
                event = %event.event,
                actor = %event.actor_id(),
                params = event.context.len(),
                issues = event.metadata.validations.len(),
                "Wire event"
            );
        }
        info!(
            sender = %self.name,
            size = batch.len(),
            first = ?batch.first().map(WireEvent::id),
            "Batch acknowledged"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wire_event;

    #[tokio::test]
    async fn test_log_sender_acknowledges() {
        let sender = LogSender::default();
        assert_eq!(sender.name(), "log");
        let batch = vec![wire_event("a"), wire_event("b")];
        assert!(sender.send(&batch).await.is_ok());
        assert!(sender.send(&[]).await.is_ok());
    }
}
