//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests between arrival and response (pending delays included)
//! - Let shutdown wait until the count drains to zero

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Global counter for request IDs used in trace output.
/// Relaxed ordering is enough, only uniqueness matters.
static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

/// Poll step while waiting for requests to drain.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shared count of requests currently being served.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    active: Arc<AtomicU64>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. The returned guard decrements on drop.
    pub fn track(&self) -> InFlightGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            active: Arc::clone(&self.active),
            seq: REQUEST_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until no request is in flight, checking every [`DRAIN_POLL_INTERVAL`].
    pub async fn drained(&self) {
        while self.active_count() > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}

/// Held for the lifetime of one request.
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<AtomicU64>,
    seq: u64,
}

impl InFlightGuard {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(request_seq = self.seq, "Request finished");
    }
}
