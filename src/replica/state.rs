//! Replica shared state
//!
//! Everything a replica mutates lives here, behind one coarse lock owned
//! by `ReplicaService`. Critical sections stay short; the lock is never
//! held across an outbound RPC.

use super::store::KvStore;
use crate::view::{Role, View};
use std::collections::VecDeque;

/// A client write buffered while a snapshot transfer is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub key: String,
    pub value: String,
}

/// Effects of installing a view, to be executed outside the lock.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewInstallation {
    /// The role changed; the new role, for logging.
    pub role_changed: Option<Role>,
    /// A snapshot transfer to this backup must start.
    pub sync_needed: Option<String>,
}

/// Mutable state of one replica
#[derive(Debug)]
pub struct ReplicaState {
    my_address: String,
    known_view: View,
    role: Role,
    pub store: KvStore,
    /// Backup named in the view when the most recent successful transfer
    /// was initiated. `None` forces a (re-)transfer on the next view
    /// observation naming a backup.
    pub last_known_backup: Option<String>,
    /// True while a snapshot is in flight to a new backup.
    pub syncing: bool,
    pending_writes: VecDeque<PendingWrite>,
}

impl ReplicaState {
    pub fn new(my_address: impl Into<String>) -> Self {
        Self {
            my_address: my_address.into(),
            known_view: View::initial(),
            role: Role::Idle,
            store: KvStore::new(),
            last_known_backup: None,
            syncing: false,
            pending_writes: VecDeque::new(),
        }
    }

    pub fn my_address(&self) -> &str {
        &self.my_address
    }

    pub fn known_view(&self) -> &View {
        &self.known_view
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn pending_len(&self) -> usize {
        self.pending_writes.len()
    }

    /// Install a view learned from the monitor and derive the local
    /// consequences. Views arrive in order over the heartbeat loop; a
    /// stale number is dropped defensively.
    pub fn install_view(&mut self, view: View) -> ViewInstallation {
        if view.number < self.known_view.number {
            return ViewInstallation::default();
        }

        let new_role = view.role_of(&self.my_address);
        let role_changed = (new_role != self.role).then_some(new_role);

        if self.role == Role::Primary && new_role != Role::Primary {
            // Demoted. Buffered writes can no longer be forwarded under
            // this replica's authority, and any completed transfer belongs
            // to the old tenure.
            self.pending_writes.clear();
            self.last_known_backup = None;
        }

        self.known_view = view;
        self.role = new_role;

        if new_role == Role::Primary && !self.known_view.has_backup() {
            // The backup slot emptied. If the same replica is re-appointed
            // later it restarted in between, so a completed transfer to it
            // no longer counts.
            self.last_known_backup = None;
        }

        let sync_needed = if new_role == Role::Primary && !self.syncing {
            match self.known_view.backup.clone() {
                Some(backup) if self.last_known_backup.as_deref() != Some(backup.as_str()) => {
                    Some(backup)
                }
                _ => None,
            }
        } else {
            None
        };

        ViewInstallation {
            role_changed,
            sync_needed,
        }
    }

    /// Buffer a write behind the in-flight snapshot.
    pub fn queue_write(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pending_writes.push_back(PendingWrite {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Take the whole buffered queue, in arrival order.
    pub fn take_pending(&mut self) -> Vec<PendingWrite> {
        self.pending_writes.drain(..).collect()
    }
}
