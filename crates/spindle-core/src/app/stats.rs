//! Dispatch counters for observability.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::dispatch_loop::{CycleOutcome, DispatchError};

/// Counters updated by the dispatch loop and its handler tasks.
#[derive(Debug, Default)]
pub struct DispatchStats {
    cycles: AtomicU64,
    inactive: AtomicU64,
    no_capacity: AtomicU64,
    idle: AtomicU64,
    submitted: AtomicU64,
    requeued: AtomicU64,
    unhandled: AtomicU64,
    queue_errors: AtomicU64,
    handled: AtomicU64,
    handler_failures: AtomicU64,
    ack_failures: AtomicU64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cycle(&self, result: &Result<CycleOutcome, DispatchError>) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        let counter = match result {
            Ok(CycleOutcome::Inactive) => &self.inactive,
            Ok(CycleOutcome::NoCapacity) => &self.no_capacity,
            Ok(CycleOutcome::Idle) => &self.idle,
            Ok(CycleOutcome::Submitted) => &self.submitted,
            Ok(CycleOutcome::Requeued) => &self.requeued,
            Err(DispatchError::NoHandler { .. }) => &self.unhandled,
            Err(DispatchError::Queue(_)) => &self.queue_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_handler_failures(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_ack_failures(&self) {
        self.ack_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            inactive: self.inactive.load(Ordering::Relaxed),
            no_capacity: self.no_capacity.load(Ordering::Relaxed),
            idle: self.idle.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            queue_errors: self.queue_errors.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            ack_failures: self.ack_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`DispatchStats`] (for reporting).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub inactive: u64,
    pub no_capacity: u64,
    pub idle: u64,
    pub submitted: u64,
    pub requeued: u64,
    pub unhandled: u64,
    pub queue_errors: u64,
    pub handled: u64,
    pub handler_failures: u64,
    pub ack_failures: u64,
}
