//! Dispatcher - single-flight drain of a durable queue through a sender
//!
//! ```text
//! Idle --trigger--> Dispatching --batch--> Draining --ok--> Dispatching
//!   ^                    |                    |
//!   +---- queue empty ---+---- failure -------+
//! ```
//!
//! Triggers (timer, dispatch-now, realtime enqueue) that arrive while a
//! cycle is running are no-ops. Every return to Idle re-arms the timer and
//! releases the lifecycle lease.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use contracts::{
    DispatchSettings, FailureKind, LifecycleLease, NetworkSender, NoopLease, SendFailure,
};
use event_queue::DurableQueue;
use observability::{BatchOutcome, DeliveryStatsAggregator, DeliverySummary};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::metrics::{DispatchMetrics, DispatchSnapshot};
use crate::timer::DispatchTimer;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Auto-dispatch period; `None` leaves only manual triggers
    pub interval: Option<Duration>,
    /// Maximum events per batch
    pub batch_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from(&DispatchSettings::default())
    }
}

impl From<&DispatchSettings> for DispatcherConfig {
    fn from(settings: &DispatchSettings) -> Self {
        Self {
            interval: settings.interval(),
            batch_size: settings.batch_size.max(1),
        }
    }
}

/// Dispatch state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Idle,
    Dispatching,
    Draining,
}

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    DispatchNow,
    Realtime,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Timer => "timer",
            Trigger::DispatchNow => "dispatch_now",
            Trigger::Realtime => "realtime",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one drain cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub trigger: Trigger,
    pub batches_sent: usize,
    pub delivered: usize,
    /// Removed after a request-invalid failure
    pub dropped: usize,
    /// Failure that ended the cycle early
    pub stopped_by: Option<SendFailure>,
}

impl CycleReport {
    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            batches_sent: 0,
            delivered: 0,
            dropped: 0,
            stopped_by: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DispatchState {
    phase: DispatchPhase,
    lease_held: bool,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<S> {
    queue: DurableQueue,
    sender: S,
    config: DispatcherConfig,
    lease: Arc<dyn LifecycleLease>,
}

impl<S> DispatcherBuilder<S>
where
    S: NetworkSender + Sync + 'static,
{
    pub fn new(queue: DurableQueue, sender: S) -> Self {
        Self {
            queue,
            sender,
            config: DispatcherConfig::default(),
            lease: Arc::new(NoopLease),
        }
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lease(mut self, lease: Arc<dyn LifecycleLease>) -> Self {
        self.lease = lease;
        self
    }

    /// Build an idle dispatcher; call `start` to arm the timer
    pub fn build(self) -> Dispatcher<S> {
        let (state, _) = watch::channel(DispatchState {
            phase: DispatchPhase::Idle,
            lease_held: false,
        });
        Dispatcher {
            inner: Arc::new(Inner {
                queue: self.queue,
                sender: self.sender,
                lease: self.lease,
                config: self.config,
                state,
                timer: DispatchTimer::new(),
                metrics: DispatchMetrics::new(),
                stats: Mutex::new(DeliveryStatsAggregator::new()),
                last_report: Mutex::new(None),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }
}

/// Handle to the dispatch state machine
///
/// Cheap to clone; all clones drive the same state.
pub struct Dispatcher<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queue", &self.inner.queue)
            .field("config", &self.inner.config)
            .field("phase", &self.inner.state.borrow().phase)
            .finish()
    }
}

impl<S> Dispatcher<S>
where
    S: NetworkSender + Sync + 'static,
{
    pub fn builder(queue: DurableQueue, sender: S) -> DispatcherBuilder<S> {
        DispatcherBuilder::new(queue, sender)
    }

    /// Arm the periodic timer
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(name = "dispatcher_start", skip(self), fields(queue = %self.inner.queue.queue_type()))]
    pub fn start(&self) {
        info!(
            interval = ?self.inner.config.interval,
            batch_size = self.inner.config.batch_size,
            sender = self.inner.sender.name(),
            "Dispatcher started"
        );
        self.inner.arm_timer();
    }

    /// Request a cycle from a timer-independent source
    ///
    /// Returns true if a new cycle was started.
    pub fn trigger(&self, trigger: Trigger) -> bool {
        self.inner.try_start(trigger, false)
    }

    /// Explicit "dispatch now" signal, holding the lifecycle lease
    ///
    /// The lease is held until the current or new cycle returns to Idle.
    pub fn dispatch_now(&self) -> bool {
        self.inner.try_start(Trigger::DispatchNow, true)
    }

    /// Wait until no cycle is running
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail
        let _ = rx.wait_for(|s| s.phase == DispatchPhase::Idle).await;
    }

    /// Stop the timer and wait for the in-flight cycle
    ///
    /// Further triggers are ignored.
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::Release);
        self.inner.timer.cancel();
        self.wait_idle().await;
        self.inner.timer.cancel();
        info!(metrics = %self.metrics(), "Dispatcher shutdown complete");
    }

    pub fn phase(&self) -> DispatchPhase {
        self.inner.state.borrow().phase
    }

    pub fn is_timer_armed(&self) -> bool {
        self.inner.timer.is_armed()
    }

    pub fn queue(&self) -> &DurableQueue {
        &self.inner.queue
    }

    pub fn metrics(&self) -> DispatchSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        lock(&self.inner.last_report).clone()
    }

    pub fn delivery_summary(&self) -> DeliverySummary {
        lock(&self.inner.stats).summary()
    }
}

struct Inner<S> {
    queue: DurableQueue,
    sender: S,
    lease: Arc<dyn LifecycleLease>,
    config: DispatcherConfig,
    state: watch::Sender<DispatchState>,
    timer: DispatchTimer,
    metrics: DispatchMetrics,
    stats: Mutex<DeliveryStatsAggregator>,
    last_report: Mutex<Option<CycleReport>>,
    shutting_down: AtomicBool,
}

impl<S> Inner<S>
where
    S: NetworkSender + Sync + 'static,
{
    /// Idle -> Dispatching compare-and-set, spawning the cycle on success
    fn try_start(self: &Arc<Self>, trigger: Trigger, hold_lease: bool) -> bool {
        let shutting_down = self.shutting_down.load(Ordering::Acquire);
        let started = self.state.send_if_modified(|state| {
            if shutting_down && state.phase == DispatchPhase::Idle {
                return false;
            }
            if hold_lease && !state.lease_held {
                self.lease.acquire();
                state.lease_held = true;
            }
            if state.phase != DispatchPhase::Idle || shutting_down {
                return false;
            }
            state.phase = DispatchPhase::Dispatching;
            true
        });

        observability::record_dispatch_trigger(trigger.as_str(), started);
        if !started {
            self.metrics.inc_skipped_triggers();
            debug!(%trigger, "Dispatch already in flight, trigger ignored");
            return false;
        }

        self.metrics.inc_cycles_started();
        self.timer.cancel();
        tokio::spawn(Arc::clone(self).run_cycle(trigger));
        true
    }

    async fn run_cycle(self: Arc<Self>, trigger: Trigger) {
        let report = self.drain(trigger).await;
        self.finish(report);
    }

    #[instrument(
        name = "dispatcher_drain",
        skip(self),
        fields(queue = %self.queue.queue_type(), sender = self.sender.name())
    )]
    async fn drain(&self, trigger: Trigger) -> CycleReport {
        let mut report = CycleReport::new(trigger);

        loop {
            if self.queue.is_empty() {
                break;
            }
            let batch = self.queue.first(self.config.batch_size);
            if batch.is_empty() {
                warn!(remaining = self.queue.len(), "No deliverable records, ending cycle");
                break;
            }

            self.set_phase(DispatchPhase::Draining);
            let started = Instant::now();
            let result = self.sender.send(&batch).await;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
            report.batches_sent += 1;
            self.metrics.inc_batches_sent();

            match result {
                Ok(()) => {
                    let removed = self.queue.remove(&batch);
                    report.delivered += removed;
                    self.metrics.add_events_delivered(removed);
                    self.record_batch(batch.len(), latency_ms, BatchOutcome::Delivered);
                    self.set_phase(DispatchPhase::Dispatching);
                    if removed < batch.len() {
                        warn!(
                            expected = batch.len(),
                            removed, "Delivered batch only partly removed, ending cycle"
                        );
                        break;
                    }
                }
                Err(failure) => {
                    match failure.kind {
                        FailureKind::RequestInvalid => {
                            let removed = self.queue.remove(&batch);
                            report.dropped += removed;
                            self.metrics.add_events_dropped(removed);
                            self.metrics.inc_request_invalid_failures();
                            self.record_batch(batch.len(), latency_ms, BatchOutcome::Dropped);
                            warn!(size = batch.len(), removed, error = %failure, "Batch rejected as invalid, dropped");
                        }
                        FailureKind::Transient => {
                            self.metrics.inc_transient_failures();
                            self.record_batch(batch.len(), latency_ms, BatchOutcome::Retained);
                            warn!(size = batch.len(), error = %failure, "Batch send failed, kept for retry");
                        }
                    }
                    report.stopped_by = Some(failure);
                    break;
                }
            }
        }

        observability::record_queue_depth(self.queue.queue_type().as_str(), self.queue.len());
        report
    }

    /// Back to Idle and release the lease, then re-arm the timer
    fn finish(self: &Arc<Self>, report: CycleReport) {
        info!(
            trigger = %report.trigger,
            batches = report.batches_sent,
            delivered = report.delivered,
            dropped = report.dropped,
            stopped_by = ?report.stopped_by.as_ref().map(|f| f.kind),
            "Dispatch cycle finished"
        );
        *lock(&self.last_report) = Some(report);

        self.state.send_modify(|state| {
            state.phase = DispatchPhase::Idle;
            if state.lease_held {
                self.lease.release();
                state.lease_held = false;
            }
        });

        // Armed only once Idle, so the next tick can always start a cycle
        if !self.shutting_down.load(Ordering::Acquire) {
            self.arm_timer();
        }
    }

    fn arm_timer(self: &Arc<Self>) {
        let Some(period) = self.config.interval else {
            return;
        };
        let weak = Arc::downgrade(self);
        self.timer.arm(period, move || {
            if let Some(inner) = weak.upgrade() {
                inner.try_start(Trigger::Timer, false);
            }
        });
    }

    fn set_phase(&self, phase: DispatchPhase) {
        self.state.send_if_modified(|state| {
            let changed = state.phase != phase;
            state.phase = phase;
            changed
        });
    }

    fn record_batch(&self, size: usize, latency_ms: f64, outcome: BatchOutcome) {
        observability::record_batch_sent(self.sender.name(), size, latency_ms, outcome);
        lock(&self.stats).update(size, latency_ms, outcome);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
