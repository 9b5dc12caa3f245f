//! In-memory ordered record index shared by the store implementations

use std::collections::{BTreeMap, HashMap};

use contracts::{ContractError, QueueRecord, QueueType};
use uuid::Uuid;

/// Records ordered by sequence, with an (queue type, id) lookup
#[derive(Debug, Default)]
pub(crate) struct RecordIndex {
    records: BTreeMap<u64, QueueRecord>,
    ids: HashMap<(QueueType, Uuid), u64>,
    next_sequence: u64,
}

impl RecordIndex {
    /// Insert a new record and assign its sequence
    pub fn insert(&mut self, mut record: QueueRecord) -> Result<u64, ContractError> {
        self.check_unique(&record)?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        record.sequence = sequence;
        self.ids.insert((record.queue_type, record.id), sequence);
        self.records.insert(sequence, record);
        Ok(sequence)
    }

    /// Re-insert a record loaded from disk, keeping its sequence
    pub fn restore(&mut self, record: QueueRecord) -> Result<(), ContractError> {
        self.check_unique(&record)?;
        if self.records.contains_key(&record.sequence) {
            return Err(ContractError::store(format!(
                "sequence {} already loaded",
                record.sequence
            )));
        }
        self.next_sequence = self.next_sequence.max(record.sequence + 1);
        self.ids.insert((record.queue_type, record.id), record.sequence);
        self.records.insert(record.sequence, record);
        Ok(())
    }

    pub fn get(&self, queue_type: QueueType, id: Uuid) -> Option<&QueueRecord> {
        self.ids
            .get(&(queue_type, id))
            .and_then(|seq| self.records.get(seq))
    }

    pub fn by_sequence(&self, sequence: u64) -> Option<&QueueRecord> {
        self.records.get(&sequence)
    }

    /// Oldest-first records of one queue type
    pub fn range(&self, queue_type: QueueType, limit: usize) -> Vec<QueueRecord> {
        self.records
            .values()
            .filter(|r| r.queue_type == queue_type)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn remove(&mut self, queue_type: QueueType, id: Uuid) -> Option<QueueRecord> {
        let sequence = self.ids.remove(&(queue_type, id))?;
        self.records.remove(&sequence)
    }

    pub fn count(&self, queue_type: QueueType) -> usize {
        self.ids.keys().filter(|(qt, _)| *qt == queue_type).count()
    }

    fn check_unique(&self, record: &QueueRecord) -> Result<(), ContractError> {
        if self.ids.contains_key(&(record.queue_type, record.id)) {
            return Err(ContractError::DuplicateRecord {
                id: record.id,
                queue_type: record.queue_type,
            });
        }
        Ok(())
    }
}
