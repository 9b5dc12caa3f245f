//! Layered error definitions
//!
//! Categorized by source: config / store / sender / sink

use thiserror::Error;
use uuid::Uuid;

use crate::QueueType;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Store Errors =====
    /// The durable store could not be opened at all
    #[error("store init error at '{location}': {message}")]
    StoreInit { location: String, message: String },

    /// A record with the same id already exists in the queue
    #[error("duplicate record {id} in {queue_type} queue")]
    DuplicateRecord { id: Uuid, queue_type: QueueType },

    /// Record could not be encoded or decoded
    #[error("record {id} codec error: {message}")]
    RecordCodec { id: Uuid, message: String },

    /// Store read/write failure
    #[error("store error: {message}")]
    Store { message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create store init error
    pub fn store_init(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreInit {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create record codec error
    pub fn record_codec(id: Uuid, message: impl Into<String>) -> Self {
        Self::RecordCodec {
            id,
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
