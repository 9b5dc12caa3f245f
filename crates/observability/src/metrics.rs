//! Pipeline and delivery metrics
//!
//! `record_*` functions feed the global `metrics` recorder (Prometheus when
//! installed, no-op otherwise). `DeliveryStatsAggregator` keeps an in-memory
//! summary for reports.

use metrics::{counter, gauge, histogram};

/// Record an event reported by the application
pub fn record_event_reported(event: &str) {
    counter!("telemetry_events_reported_total", "event" => event.to_string()).increment(1);
}

/// Record an event dropped before queueing
pub fn record_event_rejected(event: &str, code: u32) {
    counter!(
        "telemetry_events_rejected_total",
        "event" => event.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record a non-fatal validation issue
pub fn record_validation_issue(code: u32) {
    counter!("telemetry_validation_issues_total", "code" => code.to_string()).increment(1);
}

/// Record an event persisted to a queue
pub fn record_event_queued(queue: &str, realtime: bool) {
    counter!(
        "telemetry_events_queued_total",
        "queue" => queue.to_string(),
        "realtime" => realtime.to_string()
    )
    .increment(1);
}

/// Record queue depth after a mutation
pub fn record_queue_depth(queue: &str, depth: usize) {
    gauge!("telemetry_queue_depth", "queue" => queue.to_string()).set(depth as f64);
}

/// Record a dispatch trigger, started or ignored
pub fn record_dispatch_trigger(trigger: &str, started: bool) {
    let status = if started { "started" } else { "skipped" };
    counter!(
        "telemetry_dispatch_triggers_total",
        "trigger" => trigger.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record one batch send attempt
pub fn record_batch_sent(sender: &str, size: usize, latency_ms: f64, outcome: BatchOutcome) {
    counter!(
        "telemetry_dispatch_batches_total",
        "sender" => sender.to_string(),
        "outcome" => outcome.as_str().to_string()
    )
    .increment(1);
    counter!(
        "telemetry_dispatch_events_total",
        "outcome" => outcome.as_str().to_string()
    )
    .increment(size as u64);
    histogram!("telemetry_dispatch_batch_size").record(size as f64);
    histogram!("telemetry_dispatch_send_latency_ms", "sender" => sender.to_string())
        .record(latency_ms);
}

/// Record an extra sink write
pub fn record_sink_write(sink: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "telemetry_sink_writes_total",
        "sink" => sink.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// What happened to a sent batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Acknowledged and removed from the queue
    Delivered,
    /// Rejected as permanently invalid and removed
    Dropped,
    /// Transient failure, kept for retry
    Retained,
}

impl BatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOutcome::Delivered => "delivered",
            BatchOutcome::Dropped => "dropped",
            BatchOutcome::Retained => "retained",
        }
    }
}

/// Delivery statistics aggregator
///
/// Aggregates per-batch outcomes in memory for summaries.
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatsAggregator {
    pub batches: u64,
    pub delivered_events: u64,
    pub dropped_events: u64,
    pub retained_events: u64,
    pub batch_size: RunningStats,
    pub send_latency_ms: RunningStats,
}

impl DeliveryStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one batch send
    pub fn update(&mut self, size: usize, latency_ms: f64, outcome: BatchOutcome) {
        self.batches += 1;
        match outcome {
            BatchOutcome::Delivered => self.delivered_events += size as u64,
            BatchOutcome::Dropped => self.dropped_events += size as u64,
            BatchOutcome::Retained => self.retained_events += size as u64,
        }
        self.batch_size.push(size as f64);
        self.send_latency_ms.push(latency_ms);
    }

    pub fn summary(&self) -> DeliverySummary {
        let attempted = self.delivered_events + self.dropped_events + self.retained_events;
        DeliverySummary {
            batches: self.batches,
            delivered_events: self.delivered_events,
            dropped_events: self.dropped_events,
            retained_events: self.retained_events,
            delivery_rate: if attempted > 0 {
                self.delivered_events as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.batch_size),
            send_latency_ms: StatsSummary::from(&self.send_latency_ms),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Delivery summary
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub batches: u64,
    pub delivered_events: u64,
    pub dropped_events: u64,
    pub retained_events: u64,
    pub delivery_rate: f64,
    pub batch_size: StatsSummary,
    pub send_latency_ms: StatsSummary,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Batches sent: {}", self.batches)?;
        writeln!(
            f,
            "Delivered events: {} ({:.2}%)",
            self.delivered_events, self.delivery_rate
        )?;
        writeln!(f, "Dropped (invalid) events: {}", self.dropped_events)?;
        writeln!(f, "Retained for retry: {}", self.retained_events)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Send latency (ms): {}", self.send_latency_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
