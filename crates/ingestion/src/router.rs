//! EventPipeline - report path from raw event to durable queue
//!
//! ```text
//! RawEvent -> EventValidator -> EventDecorator -+-> DurableQueue -> Dispatcher
//!                                               +-> extra sinks
//! ```
//!
//! Reporting never blocks on delivery and never fails; findings are
//! returned for diagnostics only.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    EmailValidator, IdentityValidator, LifecycleLease, NetworkSender, NoopLease, QueueType,
    RawEvent, TelemetryConfig, ValidationIssue, WireEvent,
};
use dispatcher::{
    create_sink_handles, Dispatcher, DispatcherConfig, MetricsSnapshot, SinkHandle, Trigger,
};
use event_queue::{
    shared_store, DurableQueue, FileRecordStore, MemoryRecordStore, QueueFlusher, SharedStore,
};
use tracing::{error, info, instrument};

use crate::decorator::EventDecorator;
use crate::error::Result;
use crate::identity::IdentityStore;
use crate::metrics::{PipelineMetrics, PipelineSnapshot};
use crate::validator::{EventValidator, StageOutcome};

/// What happened to a reported event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Persisted for delivery, possibly with non-fatal issues
    Queued {
        issues: Vec<ValidationIssue>,
        realtime: bool,
    },
    /// Discarded before queueing
    Dropped { issues: Vec<ValidationIssue> },
}

impl ReportOutcome {
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ReportOutcome::Queued { issues, .. } | ReportOutcome::Dropped { issues } => issues,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, ReportOutcome::Queued { .. })
    }
}

/// Builder for creating an EventPipeline
pub struct EventPipelineBuilder<S> {
    config: TelemetryConfig,
    sender: S,
    store: Option<SharedStore>,
    identity: Option<Arc<IdentityStore>>,
    identity_validator: Option<Arc<dyn IdentityValidator>>,
    email_validator: Option<Arc<dyn EmailValidator>>,
    lease: Option<Arc<dyn LifecycleLease>>,
    sinks: Vec<SinkHandle>,
}

impl<S> EventPipelineBuilder<S>
where
    S: NetworkSender + Sync + 'static,
{
    pub fn new(config: TelemetryConfig, sender: S) -> Self {
        Self {
            config,
            sender,
            store: None,
            identity: None,
            identity_validator: None,
            email_validator: None,
            lease: None,
            sinks: Vec::new(),
        }
    }

    /// Use an existing store instead of the configured one
    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn identity(mut self, identity: Arc<IdentityStore>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Replace the user id validator (defaults to the identity store)
    pub fn identity_validator(mut self, validator: Arc<dyn IdentityValidator>) -> Self {
        self.identity_validator = Some(validator);
        self
    }

    /// Replace the email validator (defaults to the identity store)
    pub fn email_validator(mut self, validator: Arc<dyn EmailValidator>) -> Self {
        self.email_validator = Some(validator);
        self
    }

    pub fn lease(mut self, lease: Arc<dyn LifecycleLease>) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Add an extra sink besides the configured ones
    pub fn sink(mut self, handle: SinkHandle) -> Self {
        self.sinks.push(handle);
        self
    }

    /// Open the store, spawn sinks, arm the dispatch and flush timers
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Fails only if the durable store cannot be opened or a configured
    /// sink cannot be created.
    #[instrument(name = "pipeline_build", skip(self), fields(tenant = self.config.tenant_id))]
    pub fn build(self) -> Result<EventPipeline<S>> {
        let config = Arc::new(self.config);

        let store = match (self.store, &config.store.path) {
            (Some(store), _) => store,
            (None, Some(path)) => shared_store(FileRecordStore::open(path)?),
            (None, None) => shared_store(MemoryRecordStore::default()),
        };
        let queue = DurableQueue::with_shared(store, QueueType::Track);

        let mut sinks = self.sinks;
        sinks.extend(create_sink_handles(&config.sinks)?);

        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(IdentityStore::new()));
        let identity_validator = self
            .identity_validator
            .unwrap_or_else(|| identity.clone() as Arc<dyn IdentityValidator>);
        let email_validator = self
            .email_validator
            .unwrap_or_else(|| identity.clone() as Arc<dyn EmailValidator>);

        let dispatcher = Dispatcher::builder(queue.clone(), self.sender)
            .config(DispatcherConfig::from(&config.dispatch))
            .lease(self.lease.unwrap_or_else(|| Arc::new(NoopLease)))
            .build();
        dispatcher.start();
        let flusher = QueueFlusher::spawn(queue.clone(), config.dispatch.flush_interval());

        info!(
            events = config.events.len(),
            sinks = sinks.len(),
            pending = queue.len(),
            "Event pipeline ready"
        );

        let decorator = EventDecorator::new(
            Arc::clone(&config),
            identity.visitor_id(),
            Arc::clone(&identity_validator),
        );

        Ok(EventPipeline {
            validator: EventValidator::new(
                Arc::clone(&config),
                identity_validator,
                email_validator,
            ),
            decorator,
            config,
            identity,
            queue,
            dispatcher,
            flusher: Mutex::new(Some(flusher)),
            sinks: Mutex::new(sinks),
            metrics: PipelineMetrics::new(),
        })
    }
}

/// Report path and owner of the delivery machinery
pub struct EventPipeline<S> {
    config: Arc<TelemetryConfig>,
    validator: EventValidator,
    decorator: EventDecorator,
    identity: Arc<IdentityStore>,
    queue: DurableQueue,
    dispatcher: Dispatcher<S>,
    flusher: Mutex<Option<QueueFlusher>>,
    sinks: Mutex<Vec<SinkHandle>>,
    metrics: PipelineMetrics,
}

impl<S> EventPipeline<S>
where
    S: NetworkSender + Sync + 'static,
{
    pub fn builder(config: TelemetryConfig, sender: S) -> EventPipelineBuilder<S> {
        EventPipelineBuilder::new(config, sender)
    }

    /// Report one event
    pub fn report(&self, event: RawEvent) -> ReportOutcome {
        self.report_all(vec![event])
            .pop()
            .unwrap_or(ReportOutcome::Dropped { issues: Vec::new() })
    }

    /// Report events in order; accepted ones are enqueued as one batch
    #[instrument(name = "pipeline_report", skip(self, events), fields(count = events.len()))]
    pub fn report_all(&self, events: Vec<RawEvent>) -> Vec<ReportOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        let mut accepted: Vec<WireEvent> = Vec::new();

        for event in events {
            self.metrics.record_reported();
            observability::record_event_reported(&event.name);
            let name = event.name.clone();

            match self.run_stages(event) {
                StageOutcome::Accepted(wire) => {
                    let issues = wire.metadata.validations.clone();
                    self.record_issues(&issues);
                    outcomes.push(ReportOutcome::Queued {
                        issues,
                        realtime: wire.is_realtime(),
                    });
                    accepted.push(wire);
                }
                StageOutcome::Rejected(issues) => {
                    self.metrics.record_dropped();
                    self.record_issues(&issues);
                    let code = issues.first().map_or(0, |issue| issue.code);
                    observability::record_event_rejected(&name, code);
                    outcomes.push(ReportOutcome::Dropped { issues });
                }
            }
        }

        if !accepted.is_empty() {
            self.persist_and_forward(accepted);
        }
        outcomes
    }

    /// Explicit dispatch request, e.g. on returning to the foreground
    pub fn dispatch_now(&self) -> bool {
        self.dispatcher.dispatch_now()
    }

    /// Commit pending writes, e.g. on a process-terminate signal
    pub fn flush(&self) {
        if let Some(flusher) = lock(&self.flusher).as_ref() {
            flusher.flush_now();
        }
    }

    /// Stop timers, finish the in-flight cycle, drain sinks, final flush
    #[instrument(name = "pipeline_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;

        let sinks = std::mem::take(&mut *lock(&self.sinks));
        for handle in sinks {
            handle.shutdown().await;
        }

        let flusher = lock(&self.flusher).take();
        if let Some(flusher) = flusher {
            flusher.stop();
        }
        info!(metrics = %self.metrics(), "Event pipeline shut down");
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn identity(&self) -> &Arc<IdentityStore> {
        &self.identity
    }

    pub fn queue(&self) -> &DurableQueue {
        &self.queue
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    pub fn metrics(&self) -> PipelineSnapshot {
        self.metrics.snapshot()
    }

    pub fn sink_metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        lock(&self.sinks)
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    fn run_stages(&self, event: RawEvent) -> StageOutcome<WireEvent> {
        self.validator
            .validate(event)
            .and_then(|validated| self.decorator.decorate(validated))
    }

    fn persist_and_forward(&self, accepted: Vec<WireEvent>) {
        let stored = self.queue.enqueue(&accepted);
        self.metrics.record_queued(stored);
        if stored < accepted.len() {
            self.metrics.record_store_failures(accepted.len() - stored);
            error!(
                accepted = accepted.len(),
                stored, "Some accepted events could not be persisted"
            );
        }

        let queue_name = self.queue.queue_type().as_str();
        for wire in &accepted {
            observability::record_event_queued(queue_name, wire.is_realtime());
        }
        observability::record_queue_depth(queue_name, self.queue.len());

        {
            let sinks = lock(&self.sinks);
            for handle in sinks.iter() {
                for wire in &accepted {
                    handle.try_send(wire.clone());
                }
            }
        }

        // Persisted first, then an immediate dispatch is requested
        if accepted.iter().any(WireEvent::is_realtime) {
            self.metrics.record_realtime_trigger();
            self.dispatcher.trigger(Trigger::Realtime);
        }
    }

    fn record_issues(&self, issues: &[ValidationIssue]) {
        self.metrics.record_issues(issues.len());
        for issue in issues {
            observability::record_validation_issue(issue.code);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
