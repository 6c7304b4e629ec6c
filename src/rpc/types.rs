//! Wire types for every RPC surface
//!
//! All RPCs are JSON over HTTP. Application-level outcomes travel in the
//! `err` field of the reply body:
//! - `""` — success
//! - `"ErrNoKey"` — key absent on a read
//! - `"ErrNotPrimary"` — callee does not hold the role the caller assumed
//!
//! Transport failures are not a wire category; callers treat them like
//! `ErrNotPrimary` and re-resolve the view.

use crate::observability::MetricsSnapshot;
use crate::view::View;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Success marker in reply `err` fields.
pub const ERR_NONE: &str = "";
/// The requested key does not exist.
pub const ERR_NO_KEY: &str = "ErrNoKey";
/// The callee is not the primary (or, for forwarded writes, not the backup).
pub const ERR_NOT_PRIMARY: &str = "ErrNotPrimary";

/// Wire form of a view. Empty strings stand for unfilled slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPayload {
    pub view_number: u64,
    pub primary: String,
    pub backup: String,
}

impl ViewPayload {
    /// Convert to the internal optional form.
    pub fn into_view(self) -> View {
        View {
            number: self.view_number,
            primary: none_if_empty(self.primary),
            backup: none_if_empty(self.backup),
        }
    }
}

impl From<View> for ViewPayload {
    fn from(view: View) -> Self {
        Self {
            view_number: view.number,
            primary: view.primary.unwrap_or_default(),
            backup: view.backup.unwrap_or_default(),
        }
    }
}

fn none_if_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

// ==================
// Replica -> Monitor
// ==================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingRequest {
    /// Stable identity of the caller: its advertised listen address.
    pub server_name: String,
    /// The view number the caller currently knows.
    pub view_number: u64,
}

// ==================
// Client -> Primary
// ==================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetReply {
    pub value: String,
    pub err: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutReply {
    pub err: String,
}

// ==================
// Primary -> Backup
// ==================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardReply {
    pub err: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Full snapshot of the primary's store.
    pub data: HashMap<String, String>,
    /// View under which the snapshot was taken. Diagnostic only.
    pub view_number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReply {
    pub err: String,
}

// ==================
// Diagnostics
// ==================

/// Full store dump. Test hook and operator diagnostic, never used by the
/// replication path itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpReply {
    pub data: HashMap<String, String>,
}

/// Liveness of one registered replica, as the monitor sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaHealthPayload {
    pub address: String,
    pub alive: bool,
    pub last_advertised: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatusPayload {
    pub view: ViewPayload,
    pub primary_acked: bool,
    pub replicas: Vec<ReplicaHealthPayload>,
    pub metrics: MetricsSnapshot,
    pub started_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaStatusPayload {
    pub address: String,
    pub role: String,
    pub view: ViewPayload,
    pub store_entries: u64,
    pub syncing: bool,
    pub pending_writes: u64,
    pub last_known_backup: String,
    pub metrics: MetricsSnapshot,
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_payload_roundtrip_with_members() {
        let view = View {
            number: 7,
            primary: Some("a:1".to_string()),
            backup: Some("b:2".to_string()),
        };
        let payload = ViewPayload::from(view.clone());
        assert_eq!(payload.view_number, 7);
        assert_eq!(payload.primary, "a:1");
        assert_eq!(payload.into_view(), view);
    }

    #[test]
    fn test_empty_strings_mean_unfilled_slots() {
        let payload = ViewPayload {
            view_number: 3,
            primary: "a:1".to_string(),
            backup: String::new(),
        };
        let view = payload.into_view();
        assert_eq!(view.primary.as_deref(), Some("a:1"));
        assert!(view.backup.is_none());
    }

    #[test]
    fn test_initial_view_serializes_to_empty_members() {
        let payload = ViewPayload::from(View::initial());
        assert_eq!(payload.view_number, 0);
        assert_eq!(payload.primary, "");
        assert_eq!(payload.backup, "");
    }

    #[test]
    fn test_error_codes_match_wire_contract() {
        assert_eq!(ERR_NONE, "");
        assert_eq!(ERR_NO_KEY, "ErrNoKey");
        assert_eq!(ERR_NOT_PRIMARY, "ErrNotPrimary");
    }

    #[test]
    fn test_ping_request_json_shape() {
        let request = PingRequest {
            server_name: "127.0.0.1:4100".to_string(),
            view_number: 2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["server_name"], "127.0.0.1:4100");
        assert_eq!(json["view_number"], 2);
    }
}
