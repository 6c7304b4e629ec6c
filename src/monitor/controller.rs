//! View controller
//!
//! Owns the current view, the acknowledgement state, and the replica
//! registry, and decides when and how the view advances.
//!
//! Invariants enforced here:
//! - The view number is strictly monotonic and advances by exactly 1
//! - A view whose primary has not acknowledged it never advances away
//!   from that primary (the promotion safety gate)
//! - Appointments are deterministic: first alive replica in registration
//!   order
//!
//! All decisions take the clock as an argument, so every rule is testable
//! without waiting on real time.

use super::registry::{ObservedPing, ReplicaRegistry};
use crate::view::View;
use std::time::{Duration, Instant};

/// Why a view advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChangeReason {
    /// Dead primary, live backup: the backup was promoted.
    PrimaryFailed,
    /// Dead primary and no live backup: the view emptied.
    PrimaryLost,
    /// Dead backup removed; the primary is unchanged.
    BackupFailed,
    /// An idle replica was appointed primary of an empty view.
    PrimaryAppointed,
    /// An idle replica was appointed backup.
    BackupAppointed,
}

impl ViewChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewChangeReason::PrimaryFailed => "primary_failed",
            ViewChangeReason::PrimaryLost => "primary_lost",
            ViewChangeReason::BackupFailed => "backup_failed",
            ViewChangeReason::PrimaryAppointed => "primary_appointed",
            ViewChangeReason::BackupAppointed => "backup_appointed",
        }
    }
}

/// A published view change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewChange {
    pub previous: u64,
    pub view: View,
    pub reason: ViewChangeReason,
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do.
    Idle,
    /// A new view was published.
    Advanced(ViewChange),
    /// The primary is dead but has not acknowledged the current view;
    /// advancing now could promote a backup holding a stale store, so the
    /// view stays frozen. Service is unavailable until the primary
    /// returns. This is required behavior, not a fault.
    Blocked,
}

/// What a heartbeat changed, for the caller to log.
#[derive(Debug, Clone)]
pub struct PingOutcome {
    pub view: View,
    pub newly_registered: bool,
    pub acked_now: bool,
    pub restart_detected: bool,
}

/// The monitor's decision core
#[derive(Debug)]
pub struct ViewController {
    view: View,
    primary_acked: bool,
    registry: ReplicaRegistry,
}

impl ViewController {
    pub fn new(dead_interval: Duration) -> Self {
        Self {
            view: View::initial(),
            // View 0 has no primary, so there is nothing to acknowledge.
            primary_acked: true,
            registry: ReplicaRegistry::new(dead_interval),
        }
    }

    /// Snapshot of the current view.
    pub fn current_view(&self) -> View {
        self.view.clone()
    }

    pub fn primary_acked(&self) -> bool {
        self.primary_acked
    }

    pub fn registry(&self) -> &ReplicaRegistry {
        &self.registry
    }

    /// Handle one heartbeat: refresh liveness, register newcomers, detect
    /// restarts, and absorb the primary's acknowledgement. Returns the
    /// current view for the reply.
    pub fn handle_ping(&mut self, server_name: &str, view_number: u64, now: Instant) -> PingOutcome {
        let ObservedPing {
            newly_registered,
            regressed_to_zero,
        } = self.registry.observe_ping(server_name, view_number, now);

        let is_primary = self.view.is_primary(server_name);
        let holds_role = is_primary || self.view.is_backup(server_name);

        let mut acked_now = false;
        if is_primary && view_number == self.view.number && !self.primary_acked {
            self.primary_acked = true;
            acked_now = true;
        }

        PingOutcome {
            view: self.view.clone(),
            newly_registered,
            acked_now,
            // A regression only matters for a role holder; an idle replica
            // restarting carries no committed state.
            restart_detected: regressed_to_zero && holds_role,
        }
    }

    /// Whether a role holder is still fit for its role: alive, and not an
    /// empty-handed restart of the process that earned the role.
    fn is_serving(&self, address: &str, now: Instant) -> bool {
        self.registry.is_alive(address, now) && !self.registry.is_restarted(address)
    }

    /// Re-evaluate the view. At most one advance per call; multi-step
    /// repairs (drop a dead backup, then appoint a new one) take
    /// consecutive ticks.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let view = self.view.clone();

        // A dead primary dominates every other concern.
        if let Some(primary) = view.primary.as_deref() {
            if !self.is_serving(primary, now) {
                if !self.primary_acked {
                    // Safety gate: the primary never confirmed this view,
                    // so its backup may hold a strict prefix of committed
                    // writes. Freeze.
                    return TickOutcome::Blocked;
                }
                let change = match view.backup.as_deref() {
                    Some(backup) if self.is_serving(backup, now) => {
                        self.advance(Some(backup.to_string()), None, ViewChangeReason::PrimaryFailed)
                    }
                    _ => self.advance(None, None, ViewChangeReason::PrimaryLost),
                };
                return TickOutcome::Advanced(change);
            }
        }

        // Drop a dead (or restarted, hence empty-handed) backup. Requires
        // no acknowledgement: the primary and its data are untouched. The
        // same replica may be re-appointed next tick and will then receive
        // a fresh snapshot.
        if let Some(backup) = view.backup.as_deref() {
            if !self.is_serving(backup, now) {
                let change = self.advance(
                    view.primary.clone(),
                    None,
                    ViewChangeReason::BackupFailed,
                );
                return TickOutcome::Advanced(change);
            }
        }

        // Fill an empty primary slot.
        if !view.has_primary() && self.primary_acked {
            if let Some(candidate) = self.registry.first_alive(now, None) {
                let change =
                    self.advance(Some(candidate), None, ViewChangeReason::PrimaryAppointed);
                return TickOutcome::Advanced(change);
            }
        }

        // Fill an empty backup slot, but only under an acknowledged view:
        // an unacked primary may still be unaware it is primary at all.
        if view.has_primary() && self.primary_acked && !view.has_backup() {
            if let Some(candidate) = self
                .registry
                .first_alive(now, view.primary.as_deref())
            {
                let change = self.advance(
                    view.primary.clone(),
                    Some(candidate),
                    ViewChangeReason::BackupAppointed,
                );
                return TickOutcome::Advanced(change);
            }
        }

        TickOutcome::Idle
    }

    /// Publish the successor view and recompute the acknowledgement state.
    fn advance(
        &mut self,
        primary: Option<String>,
        backup: Option<String>,
        reason: ViewChangeReason,
    ) -> ViewChange {
        let previous = self.view.number;
        self.view = self.view.advance(primary, backup);
        // A fresh view with a primary is unacknowledged until that primary
        // heartbeats the new number; a view with no primary has nothing to
        // acknowledge.
        self.primary_acked = !self.view.has_primary();
        self.registry.clear_restart_markers();
        ViewChange {
            previous,
            view: self.view.clone(),
            reason,
        }
    }
}
