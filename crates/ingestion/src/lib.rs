//! # Ingestion
//!
//! Report path of the telemetry pipeline.
//!
//! Responsibilities:
//! - Validate raw events against configured schemas (`EventValidator`)
//! - Track session identity for the set-user-id / set-email events
//! - Decorate accepted events into wire form (`EventDecorator`)
//! - Route wire events to the durable queue and extra sinks, and trigger
//!   realtime dispatch (`EventPipeline`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use dispatcher::LogSender;
//! use ingestion::EventPipeline;
//!
//! let pipeline = EventPipeline::builder(config, LogSender::default()).build()?;
//! pipeline.report(RawEvent::new("page_view").with_attribute("path", "/"));
//! pipeline.shutdown().await;
//! ```

mod decorator;
mod error;
mod identity;
mod metrics;
mod router;
mod validator;

pub use contracts::{RawEvent, ValidationIssue, WireEvent};
pub use decorator::EventDecorator;
pub use error::{IngestionError, Result, ValidationError};
pub use identity::IdentityStore;
pub use metrics::{PipelineMetrics, PipelineSnapshot};
pub use router::{EventPipeline, EventPipelineBuilder, ReportOutcome};
pub use validator::{
    EventValidator, StageOutcome, ValidatedEvent, EMAIL_KEY, SET_EMAIL_EVENT, SET_USER_ID_EVENT,
    USER_ID_KEY,
};
