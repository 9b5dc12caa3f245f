//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Sender construction error
    #[error("failed to create sender '{name}': {message}")]
    SenderCreation { name: String, message: String },

    /// Sink write or store error (from contract)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a sender creation error
    pub fn sender_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SenderCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
