//! Dispatcher and sink metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single extra sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Events waiting in the worker channel
    queue_len: AtomicUsize,
    write_count: AtomicU64,
    failure_count: AtomicU64,
    /// Events dropped because the worker channel was full
    dropped_count: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
}

/// Counters for the dispatch state machine
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    cycles_started: AtomicU64,
    /// Triggers observed while a cycle was already running
    skipped_triggers: AtomicU64,
    batches_sent: AtomicU64,
    events_delivered: AtomicU64,
    /// Events removed after a request-invalid failure
    events_dropped: AtomicU64,
    transient_failures: AtomicU64,
    request_invalid_failures: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_cycles_started(&self) {
        self.cycles_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped_triggers(&self) {
        self.skipped_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_batches_sent(&self) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_events_delivered(&self, n: usize) {
        self.events_delivered.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn add_events_dropped(&self, n: usize) {
        self.events_dropped.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn inc_transient_failures(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_request_invalid_failures(&self) {
        self.request_invalid_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            skipped_triggers: self.skipped_triggers.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            request_invalid_failures: self.request_invalid_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatch metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub cycles_started: u64,
    pub skipped_triggers: u64,
    pub batches_sent: u64,
    pub events_delivered: u64,
    pub events_dropped: u64,
    pub transient_failures: u64,
    pub request_invalid_failures: u64,
}

impl std::fmt::Display for DispatchSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycles={} skipped={} batches={} delivered={} dropped={} transient={} invalid={}",
            self.cycles_started,
            self.skipped_triggers,
            self.batches_sent,
            self.events_delivered,
            self.events_dropped,
            self.transient_failures,
            self.request_invalid_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_snapshot() {
        let metrics = DispatchMetrics::new();
        metrics.inc_cycles_started();
        metrics.inc_batches_sent();
        metrics.add_events_delivered(50);
        metrics.add_events_dropped(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cycles_started, 1);
        assert_eq!(snapshot.events_delivered, 50);
        assert_eq!(snapshot.events_dropped, 3);
        assert!(snapshot.to_string().contains("delivered=50"));
    }
}
