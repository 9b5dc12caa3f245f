//! DispatchTimer - single re-armable delayed trigger

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Holds at most one pending tick
///
/// Arming always cancels the outstanding tick first, so ticks never
/// accumulate.
#[derive(Debug, Default)]
pub struct DispatchTimer {
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl DispatchTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_fire` after `period`, replacing any pending tick
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&self, period: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(period).await;
            on_fire();
        }));
    }

    /// Cancel the pending tick, if any
    pub fn cancel(&self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
        }
    }

    /// Whether a tick is scheduled and has not fired yet
    pub fn is_armed(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DispatchTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
