//! NetworkSender trait - delivery of batches to the collection endpoint

use std::fmt;
use thiserror::Error;

use crate::WireEvent;

/// Failure classification reported by a sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The remote can never accept this payload
    RequestInvalid,
    /// Network or server trouble, worth retrying
    Transient,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::RequestInvalid => f.write_str("request invalid"),
            FailureKind::Transient => f.write_str("transient"),
        }
    }
}

/// Classified send failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} send failure: {message}")]
pub struct SendFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SendFailure {
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::RequestInvalid,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }
}

/// Batch sender
///
/// At most one outstanding `send` per batch; the future resolves once the
/// remote acknowledged or the failure was classified.
#[trait_variant::make(NetworkSender: Send)]
pub trait LocalNetworkSender {
    /// Sender name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver a batch of events
    ///
    /// # Errors
    /// Returns a classified `SendFailure`
    async fn send(&self, batch: &[WireEvent]) -> Result<(), SendFailure>;
}
