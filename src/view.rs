//! View and role types
//!
//! A view is the authoritative cluster configuration published by the
//! monitor:
//! - Views are totally ordered by view number
//! - View 0 is the distinguished empty configuration
//! - A primary exists only at view number >= 1
//! - Each replica derives its role by comparing its own address to the view

use serde::{Deserialize, Serialize};

/// A single published cluster configuration.
///
/// Immutable once published. `None` means the slot is unfilled; the wire
/// form in `rpc::types` encodes unfilled slots as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Monotonic view number; increments by exactly 1 per change.
    pub number: u64,
    /// Address of the replica serving reads and writes, if any.
    pub primary: Option<String>,
    /// Address of the replica receiving forwarded writes, if any.
    pub backup: Option<String>,
}

impl View {
    /// The initial view `(0, None, None)`.
    ///
    /// Never published with a primary; replicas start here and advertise
    /// view 0 until they learn a real view.
    pub fn initial() -> Self {
        Self {
            number: 0,
            primary: None,
            backup: None,
        }
    }

    /// Build the successor view with the given membership.
    pub fn advance(&self, primary: Option<String>, backup: Option<String>) -> Self {
        Self {
            number: self.number + 1,
            primary,
            backup,
        }
    }

    /// Check whether a primary slot is filled.
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Check whether a backup slot is filled.
    pub fn has_backup(&self) -> bool {
        self.backup.is_some()
    }

    /// Check whether the given address is the view's primary.
    pub fn is_primary(&self, address: &str) -> bool {
        self.primary.as_deref() == Some(address)
    }

    /// Check whether the given address is the view's backup.
    pub fn is_backup(&self, address: &str) -> bool {
        self.backup.as_deref() == Some(address)
    }

    /// Derive the role the given replica holds under this view.
    pub fn role_of(&self, address: &str) -> Role {
        if self.is_primary(address) {
            Role::Primary
        } else if self.is_backup(address) {
            Role::Backup
        } else {
            Role::Idle
        }
    }
}

impl Default for View {
    fn default() -> Self {
        Self::initial()
    }
}

/// Role a replica holds under a given view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Serves client reads and writes, replicates to the backup.
    Primary,
    /// Applies forwarded writes and installed snapshots.
    Backup,
    /// Known to the monitor but holds no slot.
    Idle,
}

impl Role {
    /// Check if this role accepts client operations.
    pub fn serves_clients(&self) -> bool {
        matches!(self, Role::Primary)
    }

    /// Check if this role accepts forwarded writes and snapshots.
    pub fn accepts_replication(&self) -> bool {
        matches!(self, Role::Backup)
    }

    /// Role name for logs and status payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Backup => "backup",
            Role::Idle => "idle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_view_is_empty() {
        let view = View::initial();
        assert_eq!(view.number, 0);
        assert!(!view.has_primary());
        assert!(!view.has_backup());
    }

    #[test]
    fn test_advance_increments_number_by_one() {
        let view = View::initial();
        let next = view.advance(Some("a:1".to_string()), None);
        assert_eq!(next.number, 1);

        let after = next.advance(Some("a:1".to_string()), Some("b:2".to_string()));
        assert_eq!(after.number, 2);
    }

    #[test]
    fn test_role_derivation() {
        let view = View {
            number: 3,
            primary: Some("a:1".to_string()),
            backup: Some("b:2".to_string()),
        };

        assert_eq!(view.role_of("a:1"), Role::Primary);
        assert_eq!(view.role_of("b:2"), Role::Backup);
        assert_eq!(view.role_of("c:3"), Role::Idle);
    }

    #[test]
    fn test_roles_in_empty_view() {
        let view = View::initial();
        assert_eq!(view.role_of("a:1"), Role::Idle);
    }

    #[test]
    fn test_only_primary_serves_clients() {
        assert!(Role::Primary.serves_clients());
        assert!(!Role::Backup.serves_clients());
        assert!(!Role::Idle.serves_clients());
    }

    #[test]
    fn test_only_backup_accepts_replication() {
        assert!(!Role::Primary.accepts_replication());
        assert!(Role::Backup.accepts_replication());
        assert!(!Role::Idle.accepts_replication());
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Primary.as_str(), "primary");
        assert_eq!(Role::Backup.as_str(), "backup");
        assert_eq!(Role::Idle.as_str(), "idle");
    }
}
