//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Event lifecycle
//! `RawEvent` -> validated -> `WireEvent` -> `QueueRecord` (durable) -> deleted
//! once delivered or permanently rejected.

mod config;
mod error;
mod event;
mod identity;
mod issue;
mod lifecycle;
mod record;
mod schema;
mod sender;
mod sink;
mod wire;

pub use config::*;
pub use error::*;
pub use event::{AttributeValue, Attributes, RawEvent};
pub use identity::{EmailValidator, IdentityOutcome, IdentityValidator};
pub use issue::ValidationIssue;
pub use lifecycle::{LifecycleLease, NoopLease};
pub use record::{QueueRecord, QueueType, RecordStore};
pub use schema::{EventSchema, ParameterSpec, ParameterType};
pub use sender::{FailureKind, LocalNetworkSender, NetworkSender, SendFailure};
pub use sink::*;
pub use wire::{WireEvent, WireMetadata};
