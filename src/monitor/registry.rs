//! Replica registry and failure detector
//!
//! One record per replica address, created on first heartbeat and never
//! evicted. Records keep insertion order; role appointments use that order
//! as the deterministic tie-break.
//!
//! Liveness is purely heartbeat-derived: a replica is alive while its last
//! heartbeat is at most `dead_interval` old. An address that has never
//! heartbeated is dead.

use crate::rpc::types::ReplicaHealthPayload;
use std::time::{Duration, Instant};

/// What a single heartbeat told the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedPing {
    /// First heartbeat ever seen from this address.
    pub newly_registered: bool,
    /// The advertised view number fell back to 0 after being >= 1: the
    /// process restarted and lost its state.
    pub regressed_to_zero: bool,
}

#[derive(Debug)]
struct ReplicaRecord {
    address: String,
    last_ping: Instant,
    last_advertised: u64,
    /// Set on view-number regression; cleared only by the view controller
    /// when a new view is installed.
    restarted: bool,
}

/// Registry of every replica that has ever heartbeated
#[derive(Debug)]
pub struct ReplicaRegistry {
    dead_interval: Duration,
    records: Vec<ReplicaRecord>,
}

impl ReplicaRegistry {
    pub fn new(dead_interval: Duration) -> Self {
        Self {
            dead_interval,
            records: Vec::new(),
        }
    }

    /// Record a heartbeat from `address` advertising `view_number`.
    pub fn observe_ping(&mut self, address: &str, view_number: u64, now: Instant) -> ObservedPing {
        if let Some(record) = self.records.iter_mut().find(|r| r.address == address) {
            let regressed = view_number == 0 && record.last_advertised >= 1;
            record.last_ping = now;
            record.last_advertised = view_number;
            if regressed {
                record.restarted = true;
            }
            ObservedPing {
                newly_registered: false,
                regressed_to_zero: regressed,
            }
        } else {
            self.records.push(ReplicaRecord {
                address: address.to_string(),
                last_ping: now,
                last_advertised: view_number,
                restarted: false,
            });
            ObservedPing {
                newly_registered: true,
                regressed_to_zero: false,
            }
        }
    }

    /// Heartbeat-based liveness at `now`. Unknown addresses are dead.
    pub fn is_alive(&self, address: &str, now: Instant) -> bool {
        self.records
            .iter()
            .find(|r| r.address == address)
            .map(|r| now.duration_since(r.last_ping) <= self.dead_interval)
            .unwrap_or(false)
    }

    /// Whether the replica's current incarnation began after a restart.
    pub fn is_restarted(&self, address: &str) -> bool {
        self.records
            .iter()
            .find(|r| r.address == address)
            .map(|r| r.restarted)
            .unwrap_or(false)
    }

    /// First alive replica in insertion order, skipping `exclude`.
    pub fn first_alive(&self, now: Instant, exclude: Option<&str>) -> Option<String> {
        self.records
            .iter()
            .filter(|r| Some(r.address.as_str()) != exclude)
            .find(|r| now.duration_since(r.last_ping) <= self.dead_interval)
            .map(|r| r.address.clone())
    }

    /// Forget restart markers. Called when a new view is installed: the
    /// marker only ever condemns the standing primary.
    pub fn clear_restart_markers(&mut self) {
        for record in &mut self.records {
            record.restarted = false;
        }
    }

    /// Per-replica health for the status surface.
    pub fn health(&self, now: Instant) -> Vec<ReplicaHealthPayload> {
        self.records
            .iter()
            .map(|r| ReplicaHealthPayload {
                address: r.address.clone(),
                alive: now.duration_since(r.last_ping) <= self.dead_interval,
                last_advertised: r.last_advertised,
            })
            .collect()
    }

    /// Number of replicas ever registered.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
