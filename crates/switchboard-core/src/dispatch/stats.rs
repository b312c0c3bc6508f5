use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Runtime counters of a dispatch client.
#[derive(Debug, Default)]
pub struct DispatchStats {
    dispatched: AtomicU64,
    unrouted: AtomicU64,
    control_skipped: AtomicU64,
    handler_failures: AtomicU64,
}

/// Point-in-time copy of `DispatchStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    pub dispatched: u64,
    pub unrouted: u64,
    pub control_skipped: u64,
    pub handler_failures: u64,
}

impl DispatchStats {
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unrouted(&self) {
        self.unrouted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_control_skipped(&self) {
        self.control_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            control_skipped: self.control_skipped.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}
