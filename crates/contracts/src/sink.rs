//! DataSink trait - secondary consumers of accepted wire events
//!
//! Sinks receive a copy of every accepted event alongside the durable queue.

use crate::{ContractError, WireEvent};

/// Data output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one accepted event
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, event: &WireEvent) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
