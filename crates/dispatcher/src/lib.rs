//! # Dispatcher
//!
//! Delivery side of the telemetry pipeline.
//!
//! Responsibilities:
//! - Single-flight drain of the durable queue through a `NetworkSender`
//! - Periodic, dispatch-now and realtime triggers
//! - Poison-pill drop on request-invalid failures, retry on transient ones
//! - Extra sinks behind isolated queues (`SinkHandle`)

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod senders;
pub mod sinks;
mod timer;

pub use contracts::{DataSink, NetworkSender, WireEvent};
pub use dispatcher::{
    CycleReport, DispatchPhase, Dispatcher, DispatcherBuilder, DispatcherConfig, Trigger,
};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{DispatchMetrics, DispatchSnapshot, MetricsSnapshot, SinkMetrics};
#[cfg(feature = "http")]
pub use senders::HttpSender;
pub use senders::{classify_status, LogSender};
pub use sinks::{create_sink_handle, create_sink_handles, FileSink, FileSinkConfig, LogSink};
pub use timer::DispatchTimer;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use contracts::{Attributes, WireEvent, WireMetadata};
    use uuid::Uuid;

    pub fn wire_event(name: &str) -> WireEvent {
        WireEvent {
            tenant: 1,
            category: "track".into(),
            event: name.into(),
            origin: "sdk".into(),
            customer: None,
            visitor: "0123456789abcdef".into(),
            timestamp: Utc::now(),
            context: Attributes::from_iter([("page", "home")]),
            metadata: WireMetadata {
                channel: None,
                realtime: false,
                event_id: Uuid::new_v4(),
                validations: Vec::new(),
            },
        }
    }
}
