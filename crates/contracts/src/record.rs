//! QueueRecord and RecordStore - durable store seam
//!
//! The store itself is an external collaborator; the durable queue only
//! talks to it through `RecordStore`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{ContractError, WireEvent};

/// Queue discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueType {
    Track,
    Realtime,
}

impl QueueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueType::Track => "track",
            QueueType::Realtime => "realtime",
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted form of a WireEvent
///
/// Records are never mutated after insert, only deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: Uuid,
    pub queue_type: QueueType,
    /// Insertion order, assigned by the store on `put`
    pub sequence: u64,
    pub inserted_at: DateTime<Utc>,
    /// JSON-encoded WireEvent
    pub payload: Vec<u8>,
}

impl QueueRecord {
    /// Encode a wire event for the given queue
    pub fn encode(event: &WireEvent, queue_type: QueueType) -> Result<Self, ContractError> {
        let payload = serde_json::to_vec(event)
            .map_err(|e| ContractError::record_codec(event.id(), e.to_string()))?;
        Ok(Self {
            id: event.id(),
            queue_type,
            sequence: 0,
            inserted_at: Utc::now(),
            payload,
        })
    }

    /// Decode the stored wire event
    pub fn decode(&self) -> Result<WireEvent, ContractError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| ContractError::record_codec(self.id, e.to_string()))
    }
}

/// Durable record store
///
/// Implementations need not be thread-safe; callers serialize access.
pub trait RecordStore: Send {
    /// Store name (used for logging)
    fn name(&self) -> &str;

    /// Insert a record, returning the assigned sequence number
    ///
    /// # Errors
    /// `DuplicateRecord` when the id already exists for the queue type
    fn put(&mut self, record: QueueRecord) -> Result<u64, ContractError>;

    /// Look up a record by id
    fn get(&self, queue_type: QueueType, id: Uuid) -> Result<Option<QueueRecord>, ContractError>;

    /// Oldest-first read of at most `limit` records
    fn range(&self, queue_type: QueueType, limit: usize) -> Result<Vec<QueueRecord>, ContractError>;

    /// Delete the given ids, returning how many were present
    fn delete(&mut self, queue_type: QueueType, ids: &[Uuid]) -> Result<usize, ContractError>;

    /// Number of records for the queue type
    fn count(&self, queue_type: QueueType) -> Result<usize, ContractError>;

    /// Commit pending writes to stable storage
    fn flush(&mut self) -> Result<(), ContractError>;
}
