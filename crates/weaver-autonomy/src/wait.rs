//! Cancellable pause between cycles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

#[async_trait::async_trait]
pub trait CycleWait: Send + Sync {
    async fn wait(&self, duration: Duration, cancel: &CancellationToken) -> WaitOutcome;
}

/// Real time. Cancellation interrupts the sleep immediately.
pub struct SleepWait;

#[async_trait::async_trait]
impl CycleWait for SleepWait {
    async fn wait(&self, duration: Duration, cancel: &CancellationToken) -> WaitOutcome {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => WaitOutcome::Cancelled,
            _ = tokio::time::sleep(duration) => WaitOutcome::Elapsed,
        }
    }
}

/// Returns at once; counts how often it was asked to wait.
#[derive(Default)]
pub struct ImmediateWait {
    waits: AtomicUsize,
}

impl ImmediateWait {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CycleWait for ImmediateWait {
    async fn wait(&self, _duration: Duration, cancel: &CancellationToken) -> WaitOutcome {
        self.waits.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            WaitOutcome::Cancelled
        } else {
            WaitOutcome::Elapsed
        }
    }
}
