//! SinkHandle - extra sink behind a bounded channel and its own worker
//!
//! A slow or failing sink only ever loses its own copies; the durable
//! queue path never waits on it.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{DataSink, WireEvent};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<WireEvent>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHandle")
            .field("name", &self.name)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

impl SinkHandle {
    /// Spawn the worker task for `sink`
    pub fn spawn<S: DataSink + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Hand an event to the worker without waiting
    ///
    /// Returns false if the channel is full (event dropped for this sink).
    pub fn try_send(&self, event: WireEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.metrics.inc_dropped_count();
                warn!(sink = %self.name, id = %event.id(), "Sink queue full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Close the channel, let the worker drain it, flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Drain the channel into the sink, flushing whenever the backlog empties
#[instrument(name = "sink_worker", skip(sink, rx, metrics), fields(sink = %name))]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<WireEvent>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    let mut unflushed = 0usize;

    while let Some(event) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        let written = sink.write(&event).await;
        observability::record_sink_write(&name, written.is_ok());
        match written {
            Ok(()) => {
                metrics.inc_write_count();
                unflushed += 1;
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(id = %event.id(), error = %e, "Sink write failed, event skipped");
            }
        }

        if unflushed > 0 && rx.is_empty() {
            if let Err(e) = sink.flush().await {
                warn!(pending = unflushed, error = %e, "Sink flush failed");
            }
            unflushed = 0;
        }
    }

    if let Err(e) = sink.close().await {
        error!(error = %e, "Sink close failed");
    }
    debug!("Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wire_event;
    use contracts::ContractError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    #[derive(Default)]
    struct Observed {
        written: Mutex<Vec<String>>,
        flushes: AtomicUsize,
        closed: AtomicUsize,
    }

    /// Sink recording what reached it; events named "bad" fail
    struct RecordingSink {
        observed: Arc<Observed>,
        write_delay: Option<Duration>,
    }

    impl RecordingSink {
        fn new(observed: &Arc<Observed>) -> Self {
            Self {
                observed: Arc::clone(observed),
                write_delay: None,
            }
        }
    }

    impl DataSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn write(&mut self, event: &WireEvent) -> Result<(), ContractError> {
            if let Some(delay) = self.write_delay {
                sleep(delay).await;
            }
            if event.event == "bad" {
                return Err(ContractError::sink_write("recording", "rejected"));
            }
            self.observed.written.lock().unwrap().push(event.event.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            self.observed.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.observed.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_written_in_order_and_closed() {
        let observed = Arc::new(Observed::default());
        let handle = SinkHandle::spawn(RecordingSink::new(&observed), 8);
        assert_eq!(handle.name(), "recording");

        for name in ["a", "b", "c"] {
            assert!(handle.try_send(wire_event(name)));
        }
        handle.shutdown().await;

        assert_eq!(*observed.written.lock().unwrap(), vec!["a", "b", "c"]);
        assert!(observed.flushes.load(Ordering::SeqCst) >= 1);
        assert_eq!(observed.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_flushes_once_backlog_drains() {
        let observed = Arc::new(Observed::default());
        let handle = SinkHandle::spawn(RecordingSink::new(&observed), 8);

        assert!(handle.try_send(wire_event("a")));
        sleep(Duration::from_millis(50)).await;

        assert_eq!(observed.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(observed.closed.load(Ordering::SeqCst), 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_full_channel_drops_for_this_sink_only() {
        let observed = Arc::new(Observed::default());
        let mut sink = RecordingSink::new(&observed);
        sink.write_delay = Some(Duration::from_millis(100));
        let handle = SinkHandle::spawn(sink, 2);

        let accepted = (0..10)
            .filter(|i| handle.try_send(wire_event(&format!("e{i}"))))
            .count();

        assert!(accepted < 10);
        assert_eq!(handle.metrics().dropped_count(), (10 - accepted) as u64);
        handle.shutdown().await;
        assert_eq!(observed.written.lock().unwrap().len(), accepted);
    }

    #[tokio::test]
    async fn test_write_failure_is_skipped() {
        let observed = Arc::new(Observed::default());
        let handle = SinkHandle::spawn(RecordingSink::new(&observed), 8);

        for name in ["ok", "bad", "ok2"] {
            handle.try_send(wire_event(name));
        }
        sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.metrics().failure_count(), 1);
        assert_eq!(handle.metrics().write_count(), 2);
        handle.shutdown().await;
        assert_eq!(*observed.written.lock().unwrap(), vec!["ok", "ok2"]);
    }
}
