//! WireEvent - normalized event, the unit of persistence and delivery
//!
//! Field names are part of the collector compatibility contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Attributes, ValidationIssue};

/// Delivery metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMetadata {
    pub channel: Option<String>,

    pub realtime: bool,

    #[serde(rename = "eventId")]
    pub event_id: Uuid,

    /// Non-fatal validation findings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationIssue>,
}

/// Wire-format event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    pub tenant: u32,
    pub category: String,
    pub event: String,
    pub origin: String,
    pub customer: Option<String>,
    pub visitor: String,
    pub timestamp: DateTime<Utc>,
    pub context: Attributes,
    pub metadata: WireMetadata,
}

impl WireEvent {
    /// Unique event id
    pub fn id(&self) -> Uuid {
        self.metadata.event_id
    }

    /// Customer id when known, visitor id otherwise
    pub fn actor_id(&self) -> &str {
        self.customer.as_deref().unwrap_or(&self.visitor)
    }

    pub fn is_realtime(&self) -> bool {
        self.metadata.realtime
    }
}
