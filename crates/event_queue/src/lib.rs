//! # Event Queue
//!
//! Durable, order-preserving queue of wire events.
//!
//! Responsibilities:
//! - `RecordStore` implementations (memory, file)
//! - `DurableQueue`: enqueue / first / remove / is_empty per queue type
//! - `QueueFlusher`: periodic and on-demand commit to stable storage
//!
//! ## Durability
//!
//! A crash between enqueue and flush may lose the unflushed tail; records
//! already flushed are never corrupted.

mod file;
mod flusher;
mod index;
mod memory;
mod queue;

pub use contracts::{QueueRecord, QueueType, RecordStore};
pub use file::FileRecordStore;
pub use flusher::QueueFlusher;
pub use memory::MemoryRecordStore;
pub use queue::{shared_store, DurableQueue, SharedStore};
