//! MemoryRecordStore - volatile store for tests and hosts without a disk

use contracts::{ContractError, QueueRecord, QueueType, RecordStore};
use uuid::Uuid;

use crate::index::RecordIndex;

/// In-memory record store; `flush` is a no-op
#[derive(Debug)]
pub struct MemoryRecordStore {
    name: String,
    index: RecordIndex,
}

impl MemoryRecordStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: RecordIndex::default(),
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl RecordStore for MemoryRecordStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn put(&mut self, record: QueueRecord) -> Result<u64, ContractError> {
        self.index.insert(record)
    }

    fn get(&self, queue_type: QueueType, id: Uuid) -> Result<Option<QueueRecord>, ContractError> {
        Ok(self.index.get(queue_type, id).cloned())
    }

    fn range(&self, queue_type: QueueType, limit: usize) -> Result<Vec<QueueRecord>, ContractError> {
        Ok(self.index.range(queue_type, limit))
    }

    fn delete(&mut self, queue_type: QueueType, ids: &[Uuid]) -> Result<usize, ContractError> {
        Ok(ids
            .iter()
            .filter(|id| self.index.remove(queue_type, **id).is_some())
            .count())
    }

    fn count(&self, queue_type: QueueType) -> Result<usize, ContractError> {
        Ok(self.index.count(queue_type))
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
