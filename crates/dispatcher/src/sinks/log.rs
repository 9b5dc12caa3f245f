//! LogSink - logs a summary of each accepted event via tracing

use contracts::{ContractError, DataSink, WireEvent};
use tracing::{info, instrument};

/// Sink that logs event summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, event),
        fields(sink = %self.name, id = %event.id())
    )]
    async fn write(&mut self, event: &WireEvent) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            event = %event.event,
            actor = %event.actor_id(),
            params = event.context.len(),
            issues = event.metadata.validations.len(),
            realtime = event.metadata.realtime,
            "Event accepted"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
