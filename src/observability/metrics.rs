//! Operational counters
//!
//! - Counters only, monotonic, reset on process start
//! - Thread-safe via relaxed atomics; exact ordering between counters is
//!   not needed for status reporting

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter registry shared by a component's handlers and loops
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Heartbeats handled (monitor)
    pings_received: AtomicU64,
    /// Views published (monitor)
    views_advanced: AtomicU64,
    /// Reads served to clients (replica, primary role)
    reads_served: AtomicU64,
    /// Writes accepted from clients (replica, primary role)
    writes_accepted: AtomicU64,
    /// Writes queued behind an in-flight snapshot transfer
    writes_queued: AtomicU64,
    /// Writes forwarded to the backup
    writes_forwarded: AtomicU64,
    /// Forward attempts that failed or were rejected
    forward_failures: AtomicU64,
    /// Snapshot transfers started
    transfers_started: AtomicU64,
    /// Snapshot transfers completed
    transfers_completed: AtomicU64,
    /// Snapshot transfers failed
    transfers_failed: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_pings(&self) {
        self.pings_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_views_advanced(&self) {
        self.views_advanced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reads(&self) {
        self.reads_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes(&self) {
        self.writes_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_queued(&self) {
        self.writes_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_forwarded(&self) {
        self.writes_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_forward_failures(&self) {
        self.forward_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transfers_started(&self) {
        self.transfers_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transfers_completed(&self) {
        self.transfers_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transfers_failed(&self) {
        self.transfers_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters for status payloads.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pings_received: self.pings_received.load(Ordering::Relaxed),
            views_advanced: self.views_advanced.load(Ordering::Relaxed),
            reads_served: self.reads_served.load(Ordering::Relaxed),
            writes_accepted: self.writes_accepted.load(Ordering::Relaxed),
            writes_queued: self.writes_queued.load(Ordering::Relaxed),
            writes_forwarded: self.writes_forwarded.load(Ordering::Relaxed),
            forward_failures: self.forward_failures.load(Ordering::Relaxed),
            transfers_started: self.transfers_started.load(Ordering::Relaxed),
            transfers_completed: self.transfers_completed.load(Ordering::Relaxed),
            transfers_failed: self.transfers_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub pings_received: u64,
    pub views_advanced: u64,
    pub reads_served: u64,
    pub writes_accepted: u64,
    pub writes_queued: u64,
    pub writes_forwarded: u64,
    pub forward_failures: u64,
    pub transfers_started: u64,
    pub transfers_completed: u64,
    pub transfers_failed: u64,
}
