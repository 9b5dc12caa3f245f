//! Lifecycle lease - "do not suspend the process" token held during a drain

/// Platform keep-alive capability
pub trait LifecycleLease: Send + Sync {
    /// Ask the platform to keep the process running
    fn acquire(&self);

    /// Give the keep-alive back
    fn release(&self);
}

/// Lease for platforms without suspension
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLease;

impl LifecycleLease for NoopLease {
    fn acquire(&self) {}

    fn release(&self) {}
}
