//! TelemetryConfig - Config Loader output
//!
//! Tenant identity, event schemas, validation limits, dispatch policy and
//! extra sink routing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::EventSchema;

/// Complete SDK configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelemetryConfig {
    /// Tenant id stamped on every wire event
    #[validate(range(min = 1))]
    pub tenant_id: u32,

    /// Event name -> schema
    #[serde(default)]
    pub events: BTreeMap<String, EventSchema>,

    /// Validation limits
    #[serde(default)]
    #[validate(nested)]
    pub limits: ValidationLimits,

    /// Dispatch policy
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchSettings,

    /// Wire decoration defaults
    #[serde(default)]
    pub decoration: DecorationSettings,

    /// Durable store location
    #[serde(default)]
    pub store: StoreSettings,

    /// Extra sinks fed alongside the queue
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

impl TelemetryConfig {
    /// Minimal configuration for a tenant with no events
    pub fn new(tenant_id: u32) -> Self {
        Self {
            tenant_id,
            events: BTreeMap::new(),
            limits: ValidationLimits::default(),
            dispatch: DispatchSettings::default(),
            decoration: DecorationSettings::default(),
            store: StoreSettings::default(),
            sinks: Vec::new(),
        }
    }

    /// Register an event schema under its name
    pub fn with_event(mut self, schema: EventSchema) -> Self {
        self.events.insert(schema.name.clone(), schema);
        self
    }

    /// Parameter limit for an event, falling back to the global one
    pub fn max_parameters_for(&self, schema: &EventSchema) -> usize {
        schema.max_parameters.unwrap_or(self.limits.max_parameters)
    }
}

/// Validation limits
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ValidationLimits {
    /// Maximum parameters per event
    #[validate(range(min = 1))]
    pub max_parameters: usize,
    /// Maximum textual length of a string/number parameter
    #[validate(range(min = 1))]
    pub legal_parameter_length: usize,
    /// Maximum length of a user id
    #[validate(range(min = 1))]
    pub legal_user_id_length: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_parameters: 50,
            legal_parameter_length: 4_000,
            legal_user_id_length: 200,
        }
    }
}

/// Dispatch policy
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DispatchSettings {
    /// Seconds between automatic dispatch cycles (<= 0 disables the timer)
    pub interval_s: f64,
    /// Maximum events per batch
    #[validate(range(min = 1))]
    pub batch_size: usize,
    /// Global switch for realtime-triggered dispatch
    pub realtime_enabled: bool,
    /// Seconds between durable store flushes (<= 0 disables the timer)
    pub flush_interval_s: f64,
}

impl DispatchSettings {
    /// Timer period, `None` when auto-dispatch is disabled
    pub fn interval(&self) -> Option<Duration> {
        positive_secs(self.interval_s)
    }

    /// Flush period, `None` when periodic flushing is disabled
    pub fn flush_interval(&self) -> Option<Duration> {
        positive_secs(self.flush_interval_s)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            interval_s: 10.0,
            batch_size: 50,
            realtime_enabled: true,
            flush_interval_s: 1.0,
        }
    }
}

/// Values a `Duration` cannot hold count as disabled
fn positive_secs(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// Wire decoration defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecorationSettings {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub channel: Option<String>,
}

fn default_category() -> String {
    "track".to_string()
}

fn default_origin() -> String {
    "sdk".to_string()
}

impl Default for DecorationSettings {
    fn default() -> Self {
        Self {
            category: default_category(),
            origin: default_origin(),
            channel: None,
        }
    }
}

/// Durable store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory of the file-backed store; in-memory when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Extra sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Worker queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Extra sink kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Structured log line per event
    Log,
    /// JSON lines appended to a file
    File,
}
