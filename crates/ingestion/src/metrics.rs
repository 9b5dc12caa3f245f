//! Pipeline metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the report path
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    events_reported: AtomicU64,
    events_queued: AtomicU64,
    /// Rejected by a fatal validation issue
    events_dropped: AtomicU64,
    /// Accepted but not persisted
    store_failures: AtomicU64,
    issues_recorded: AtomicU64,
    realtime_triggers: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reported(&self) {
        self.events_reported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queued(&self, n: usize) {
        self.events_queued.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failures(&self, n: usize) {
        self.store_failures.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_issues(&self, n: usize) {
        self.issues_recorded.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_realtime_trigger(&self) {
        self.realtime_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            events_reported: self.events_reported.load(Ordering::Relaxed),
            events_queued: self.events_queued.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            issues_recorded: self.issues_recorded.load(Ordering::Relaxed),
            realtime_triggers: self.realtime_triggers.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub events_reported: u64,
    pub events_queued: u64,
    pub events_dropped: u64,
    pub store_failures: u64,
    pub issues_recorded: u64,
    pub realtime_triggers: u64,
}

impl std::fmt::Display for PipelineSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reported={} queued={} dropped={} store_failures={} issues={} realtime={}",
            self.events_reported,
            self.events_queued,
            self.events_dropped,
            self.store_failures,
            self.issues_recorded,
            self.realtime_triggers
        )
    }
}
