//! Replica
//!
//! A replica learns its role from every heartbeat reply and, as primary,
//! serves client reads and writes while replicating synchronously to the
//! backup:
//! - Writes reach the backup before the client sees success
//! - A newly designated backup receives a full snapshot before forwarded
//!   writes resume; writes accepted mid-transfer are buffered and drained
//!   in order behind it
//! - Role confusion during view transitions surfaces as `ErrNotPrimary`
//!   and resolves through the next heartbeat

mod config;
mod errors;
mod routes;
mod server;
mod service;
mod state;
mod store;

pub use config::{ReplicaConfig, DEFAULT_PING_INTERVAL};
pub use errors::{ReplicaError, ReplicaResult};
pub use routes::replica_routes;
pub use server::ReplicaServer;
pub use service::{ForwardOutcome, GetOutcome, PutOutcome, ReplicaService, SyncOutcome};
pub use state::{PendingWrite, ReplicaState, ViewInstallation};
pub use store::KvStore;
