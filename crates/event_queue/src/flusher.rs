//! QueueFlusher - periodic commit of pending writes

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, instrument, warn};

use crate::DurableQueue;

/// Background flush timer, stopped on drop
#[derive(Debug)]
pub struct QueueFlusher {
    queue: DurableQueue,
    handle: Option<JoinHandle<()>>,
}

impl QueueFlusher {
    /// Spawn the flush loop; `None` period means flush only on demand
    ///
    /// Must be called from within a tokio runtime when a period is given.
    #[instrument(name = "queue_flusher_spawn", skip(queue), fields(queue = %queue.queue_type()))]
    pub fn spawn(queue: DurableQueue, period: Option<Duration>) -> Self {
        let handle = period.map(|period| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if let Err(e) = queue.flush() {
                        warn!(queue = %queue.queue_type(), error = %e, "Periodic flush failed");
                    }
                }
            })
        });
        Self { queue, handle }
    }

    /// Flush now, e.g. on a process-terminate signal
    pub fn flush_now(&self) {
        if let Err(e) = self.queue.flush() {
            warn!(queue = %self.queue.queue_type(), error = %e, "Flush failed");
        }
    }

    /// Stop the timer and do a final flush
    pub fn stop(mut self) {
        self.abort();
        self.flush_now();
        debug!(queue = %self.queue.queue_type(), "QueueFlusher stopped");
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for QueueFlusher {
    fn drop(&mut self) {
        self.abort();
    }
}
