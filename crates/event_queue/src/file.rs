//! FileRecordStore - one file per record, crash-safe flush
//!
//! Layout: `<root>/<queue_type>/<sequence>.rec`, bincode-encoded.
//! `put` stages records in memory; `flush` writes each staged record to a
//! temp file and renames it into place, so a flushed record is either
//! complete on disk or absent. Each queue directory whose entries changed
//! is fsynced once per flush.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use contracts::{ContractError, QueueRecord, QueueType, RecordStore};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::index::RecordIndex;

const RECORD_EXT: &str = "rec";
const TEMP_EXT: &str = "tmp";
const QUEUE_TYPES: [QueueType; 2] = [QueueType::Track, QueueType::Realtime];

/// File-backed record store
#[derive(Debug)]
pub struct FileRecordStore {
    name: String,
    root: PathBuf,
    index: RecordIndex,
    /// Sequences inserted but not yet on disk
    staged: BTreeSet<u64>,
    /// Queue directories with renames or unlinks not yet fsynced
    unsynced_dirs: BTreeSet<QueueType>,
}

impl FileRecordStore {
    /// Open (or create) a store rooted at `root`
    ///
    /// # Errors
    /// `StoreInit` when the directory cannot be created or listed
    #[instrument(name = "file_store_open", skip(root), fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ContractError> {
        let root = root.as_ref().to_path_buf();
        let mut index = RecordIndex::default();

        for queue_type in QUEUE_TYPES {
            let dir = root.join(queue_type.as_str());
            fs::create_dir_all(&dir)
                .map_err(|e| ContractError::store_init(dir.display().to_string(), e.to_string()))?;
            Self::load_dir(&dir, &mut index)?;
        }

        let store = Self {
            name: format!("file:{}", root.display()),
            root,
            index,
            staged: BTreeSet::new(),
            unsynced_dirs: BTreeSet::new(),
        };
        info!(
            store = %store.name,
            track = store.index.count(QueueType::Track),
            realtime = store.index.count(QueueType::Realtime),
            "FileRecordStore opened"
        );
        Ok(store)
    }

    /// Number of records not yet flushed
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    fn load_dir(dir: &Path, index: &mut RecordIndex) -> Result<(), ContractError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| ContractError::store_init(dir.display().to_string(), e.to_string()))?;

        for entry in entries.flatten() {
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some(RECORD_EXT) => {}
                Some(TEMP_EXT) => {
                    // Interrupted flush; the record never became durable
                    debug!(path = %path.display(), "Removing leftover temp file");
                    let _ = fs::remove_file(&path);
                    continue;
                }
                _ => continue,
            }
            match Self::read_record(&path) {
                Ok(record) => {
                    if let Err(e) = index.restore(record) {
                        warn!(path = %path.display(), error = %e, "Skipping record");
                    }
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable record"),
            }
        }
        Ok(())
    }

    fn read_record(path: &Path) -> Result<QueueRecord, ContractError> {
        let bytes = fs::read(path)?;
        bincode::deserialize(&bytes).map_err(|e| ContractError::store(e.to_string()))
    }

    fn record_path(&self, queue_type: QueueType, sequence: u64) -> PathBuf {
        self.root
            .join(queue_type.as_str())
            .join(format!("{sequence:020}.{RECORD_EXT}"))
    }

    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> Result<(), ContractError> {
        fs::File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> Result<(), ContractError> {
        Ok(())
    }

    fn write_record(&self, record: &QueueRecord) -> Result<(), ContractError> {
        let path = self.record_path(record.queue_type, record.sequence);
        let tmp = path.with_extension(TEMP_EXT);
        let bytes = bincode::serialize(record)
            .map_err(|e| ContractError::record_codec(record.id, e.to_string()))?;

        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn put(&mut self, record: QueueRecord) -> Result<u64, ContractError> {
        let sequence = self.index.insert(record)?;
        self.staged.insert(sequence);
        Ok(sequence)
    }

    fn get(&self, queue_type: QueueType, id: Uuid) -> Result<Option<QueueRecord>, ContractError> {
        Ok(self.index.get(queue_type, id).cloned())
    }

    fn range(&self, queue_type: QueueType, limit: usize) -> Result<Vec<QueueRecord>, ContractError> {
        Ok(self.index.range(queue_type, limit))
    }

    fn delete(&mut self, queue_type: QueueType, ids: &[Uuid]) -> Result<usize, ContractError> {
        let mut removed = 0;
        for id in ids {
            let Some(record) = self.index.remove(queue_type, *id) else {
                continue;
            };
            removed += 1;
            if self.staged.remove(&record.sequence) {
                continue;
            }
            let path = self.record_path(queue_type, record.sequence);
            match fs::remove_file(&path) {
                Ok(()) => {
                    self.unsynced_dirs.insert(queue_type);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to unlink record"),
            }
        }
        Ok(removed)
    }

    fn count(&self, queue_type: QueueType) -> Result<usize, ContractError> {
        Ok(self.index.count(queue_type))
    }

    #[instrument(name = "file_store_flush", skip(self), fields(store = %self.name, staged = self.staged.len()))]
    fn flush(&mut self) -> Result<(), ContractError> {
        let mut first_error = None;
        let staged: Vec<u64> = self.staged.iter().copied().collect();

        for sequence in staged {
            let Some(record) = self.index.by_sequence(sequence) else {
                self.staged.remove(&sequence);
                continue;
            };
            let queue_type = record.queue_type;
            match self.write_record(record) {
                Ok(()) => {
                    self.staged.remove(&sequence);
                    self.unsynced_dirs.insert(queue_type);
                }
                Err(e) => {
                    warn!(sequence, error = %e, "Failed to flush record");
                    first_error.get_or_insert(e);
                }
            }
        }

        let dirs: Vec<QueueType> = self.unsynced_dirs.iter().copied().collect();
        for queue_type in dirs {
            let dir = self.root.join(queue_type.as_str());
            match Self::sync_dir(&dir) {
                Ok(()) => {
                    self.unsynced_dirs.remove(&queue_type);
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Failed to sync queue directory");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
