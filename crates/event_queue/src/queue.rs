//! DurableQueue - order-preserving persistent queue of wire events
//!
//! All operations funnel through one mutex around the record store, so
//! producers and the dispatcher can share a queue freely. Per-record
//! failures are logged and skipped; none of the operations abort a batch.

use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{ContractError, QueueRecord, QueueType, RecordStore, WireEvent};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Store handle shared by every queue type living in it
pub type SharedStore = Arc<Mutex<Box<dyn RecordStore>>>;

/// Wrap a store for sharing between queues
pub fn shared_store(store: impl RecordStore + 'static) -> SharedStore {
    Arc::new(Mutex::new(Box::new(store)))
}

/// Durable queue bound to one queue type
#[derive(Clone)]
pub struct DurableQueue {
    queue_type: QueueType,
    store: SharedStore,
}

impl std::fmt::Debug for DurableQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableQueue")
            .field("queue_type", &self.queue_type)
            .finish()
    }
}

impl DurableQueue {
    /// Create a queue owning its store
    pub fn new(store: impl RecordStore + 'static, queue_type: QueueType) -> Self {
        Self::with_shared(shared_store(store), queue_type)
    }

    /// Create a queue over a store shared with other queue types
    pub fn with_shared(store: SharedStore, queue_type: QueueType) -> Self {
        Self { queue_type, store }
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Append events in order
    ///
    /// Returns how many were stored; failed inserts are logged and skipped.
    pub fn enqueue(&self, events: &[WireEvent]) -> usize {
        let mut store = self.lock();
        let mut stored = 0;
        for event in events {
            let result = QueueRecord::encode(event, self.queue_type).and_then(|r| store.put(r));
            match result {
                Ok(sequence) => {
                    stored += 1;
                    debug!(queue = %self.queue_type, id = %event.id(), sequence, "Enqueued");
                }
                Err(e) => warn!(queue = %self.queue_type, id = %event.id(), error = %e, "Enqueue failed"),
            }
        }
        stored
    }

    /// Oldest-first read of at most `limit` events
    ///
    /// Records that fail to decode are purged and the read is repeated, so
    /// corrupt records never take the place of deliverable ones.
    pub fn first(&self, limit: usize) -> Vec<WireEvent> {
        let mut store = self.lock();
        loop {
            let records = match store.range(self.queue_type, limit) {
                Ok(records) => records,
                Err(e) => {
                    error!(queue = %self.queue_type, error = %e, "Range read failed");
                    return Vec::new();
                }
            };

            let mut corrupt = Vec::new();
            let events: Vec<WireEvent> = records
                .iter()
                .filter_map(|record| match record.decode() {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!(queue = %self.queue_type, error = %e, "Skipping corrupt record");
                        corrupt.push(record.id);
                        None
                    }
                })
                .collect();

            if corrupt.is_empty() {
                return events;
            }
            match store.delete(self.queue_type, &corrupt) {
                Ok(removed) if removed > 0 => {
                    debug!(queue = %self.queue_type, removed, "Purged corrupt records");
                }
                Ok(_) => return events,
                Err(e) => {
                    error!(queue = %self.queue_type, error = %e, "Purging corrupt records failed");
                    return events;
                }
            }
        }
    }

    /// Delete the given events by id; unknown ids are ignored
    pub fn remove(&self, events: &[WireEvent]) -> usize {
        let ids: Vec<Uuid> = events.iter().map(WireEvent::id).collect();
        self.remove_ids(&ids)
    }

    /// Delete records by id; unknown ids are ignored
    pub fn remove_ids(&self, ids: &[Uuid]) -> usize {
        match self.lock().delete(self.queue_type, ids) {
            Ok(removed) => {
                debug!(queue = %self.queue_type, requested = ids.len(), removed, "Removed");
                removed
            }
            Err(e) => {
                error!(queue = %self.queue_type, error = %e, "Remove failed");
                0
            }
        }
    }

    /// Point-in-time emptiness check
    ///
    /// A failing count reads as empty so the dispatcher goes back to idle.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self.lock().count(self.queue_type) {
            Ok(count) => count,
            Err(e) => {
                error!(queue = %self.queue_type, error = %e, "Count failed");
                0
            }
        }
    }

    /// Commit pending writes to stable storage
    pub fn flush(&self) -> Result<(), ContractError> {
        self.lock().flush()
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn RecordStore>> {
        // A panic while holding the lock leaves the store itself consistent
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
