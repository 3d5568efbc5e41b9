use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Operational counters for the monitor itself
#[derive(Debug, Default)]
pub struct MonitorMetrics {
    events_seen: AtomicU64,
    events_sampled: AtomicU64,
    unresolved_objects: AtomicU64,
    records_emitted: AtomicU64,
    records_dropped: AtomicU64,
    stacks_attempted: AtomicU64,
    stacks_captured: AtomicU64,
    stacks_truncated: AtomicU64,
    soft_failures: AtomicU64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sampled(&self) {
        self.events_sampled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unresolved(&self) {
        self.unresolved_objects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emitted(&self) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stack_attempt(&self, captured: bool, truncated: bool) {
        self.stacks_attempted.fetch_add(1, Ordering::Relaxed);
        if captured {
            self.stacks_captured.fetch_add(1, Ordering::Relaxed);
        }
        if truncated {
            self.stacks_truncated.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_soft_failure(&self) {
        self.soft_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_seen: self.events_seen.load(Ordering::Relaxed),
            events_sampled: self.events_sampled.load(Ordering::Relaxed),
            unresolved_objects: self.unresolved_objects.load(Ordering::Relaxed),
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            stacks_attempted: self.stacks_attempted.load(Ordering::Relaxed),
            stacks_captured: self.stacks_captured.load(Ordering::Relaxed),
            stacks_truncated: self.stacks_truncated.load(Ordering::Relaxed),
            soft_failures: self.soft_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub events_seen: u64,
    pub events_sampled: u64,
    pub unresolved_objects: u64,
    pub records_emitted: u64,
    pub records_dropped: u64,
    pub stacks_attempted: u64,
    pub stacks_captured: u64,
    pub stacks_truncated: u64,
    pub soft_failures: u64,
}
