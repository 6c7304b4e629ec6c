//! Replica service
//!
//! Owns the shared state and implements every operation a replica serves:
//! client reads and writes, forwarded writes, snapshot installation, the
//! heartbeat loop, and the snapshot-transfer task.
//!
//! Locking discipline:
//! - `state` is the coarse lock; critical sections only read or mutate
//!   memory and never span an outbound RPC
//! - `write_slot` is the logical write token of a primary: forwarded
//!   writes and snapshot transfers are serialized through it, which keeps
//!   the backup's apply order equal to the primary's acceptance order and
//!   fences the snapshot against concurrent forwards

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::config::ReplicaConfig;
use super::errors::ReplicaResult;
use super::state::{PendingWrite, ReplicaState};
use crate::observability::{Event, LogLine, MetricsRegistry};
use crate::rpc::types::{ReplicaStatusPayload, ViewPayload, ERR_NONE};
use crate::rpc::RpcClient;
use crate::view::Role;

/// Outcome of a client read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    Value(String),
    NoKey,
    NotPrimary,
}

/// Outcome of a client write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// Applied locally and forwarded (best effort) to the backup.
    Applied,
    /// Buffered behind an in-flight snapshot transfer. The client still
    /// sees success; the write lands after the snapshot, in order.
    Queued,
    NotPrimary,
}

/// Outcome of a forwarded write at the backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    Applied,
    NotBackup,
}

/// Outcome of a snapshot installation at the backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Installed,
    /// The callee does not (yet) believe it is the backup. The primary
    /// clears its transfer record and retries on a later heartbeat.
    Rejected,
}

/// One replica process's service core
pub struct ReplicaService {
    config: ReplicaConfig,
    my_address: String,
    state: Mutex<ReplicaState>,
    /// The primary's logical write token. Held across outbound forward
    /// and snapshot RPCs, never while idle.
    write_slot: tokio::sync::Mutex<()>,
    rpc: RpcClient,
    metrics: MetricsRegistry,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl ReplicaService {
    /// Build the service core. `my_address` is the actual bound address,
    /// which doubles as the replica's identity.
    pub fn new(config: ReplicaConfig, my_address: impl Into<String>) -> ReplicaResult<Self> {
        let rpc = RpcClient::with_timeout(config.rpc_timeout)?;
        let my_address = my_address.into();
        Ok(Self {
            config,
            state: Mutex::new(ReplicaState::new(my_address.clone())),
            my_address,
            write_slot: tokio::sync::Mutex::new(()),
            rpc,
            metrics: MetricsRegistry::new(),
            started_at: chrono::Utc::now(),
        })
    }

    pub fn my_address(&self) -> &str {
        &self.my_address
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ReplicaState> {
        self.state.lock().expect("replica lock poisoned")
    }

    // ==================
    // Client operations (primary only)
    // ==================

    /// Serve a client read. Reads never leave the primary.
    pub fn get(&self, key: &str) -> GetOutcome {
        let state = self.lock_state();
        if state.role() != Role::Primary {
            return GetOutcome::NotPrimary;
        }
        let outcome = match state.store.get(key) {
            Some(value) => GetOutcome::Value(value.to_string()),
            None => GetOutcome::NoKey,
        };
        drop(state);
        self.metrics.increment_reads();
        outcome
    }

    /// Serve a client write: replicate to the backup, then apply locally.
    ///
    /// While a snapshot transfer is in flight the write is buffered
    /// instead; the snapshot predates it, so replaying it through the
    /// forward path after installation keeps the backup exact.
    pub async fn put(&self, key: &str, value: &str) -> PutOutcome {
        {
            let mut state = self.lock_state();
            if state.role() != Role::Primary {
                return PutOutcome::NotPrimary;
            }
            if state.syncing {
                state.queue_write(key, value);
                drop(state);
                self.metrics.increment_writes_queued();
                Event::WriteQueued.log().field("key", key).emit();
                return PutOutcome::Queued;
            }
        }

        let _slot = self.write_slot.lock().await;

        // The world may have moved while we waited for the slot.
        let backup = {
            let mut state = self.lock_state();
            if state.role() != Role::Primary {
                return PutOutcome::NotPrimary;
            }
            if state.syncing {
                state.queue_write(key, value);
                drop(state);
                self.metrics.increment_writes_queued();
                Event::WriteQueued.log().field("key", key).emit();
                return PutOutcome::Queued;
            }
            state.known_view().backup.clone()
        };

        if let Some(backup) = backup.as_deref() {
            self.forward_to_backup(backup, key, value).await;
        }

        self.lock_state().store.put(key, value);
        self.metrics.increment_writes();
        PutOutcome::Applied
    }

    /// Relay one write to the backup. Failure is absorbed: the monitor is
    /// the authority on backup liveness and will repair via a view change.
    async fn forward_to_backup(&self, backup: &str, key: &str, value: &str) {
        match self.rpc.forward_update(backup, key, value).await {
            Ok(reply) if reply.err == ERR_NONE => {
                self.metrics.increment_writes_forwarded();
            }
            Ok(reply) => {
                self.metrics.increment_forward_failures();
                Event::ForwardFailed
                    .log()
                    .field("backup", backup)
                    .field("err", &reply.err)
                    .emit();
            }
            Err(err) => {
                self.metrics.increment_forward_failures();
                Event::ForwardFailed
                    .log()
                    .field("backup", backup)
                    .field("err", &err)
                    .emit();
            }
        }
    }

    // ==================
    // Peer operations (backup only)
    // ==================

    /// Apply a write forwarded by the primary.
    pub fn forward_update(&self, key: &str, value: &str) -> ForwardOutcome {
        let mut state = self.lock_state();
        if state.role() != Role::Backup {
            return ForwardOutcome::NotBackup;
        }
        state.store.put(key, value);
        ForwardOutcome::Applied
    }

    /// Install a full snapshot from the primary, replacing the store.
    /// The view number is diagnostic only.
    pub fn sync_state(&self, data: HashMap<String, String>, view_number: u64) -> SyncOutcome {
        let mut state = self.lock_state();
        if state.role() != Role::Backup {
            return SyncOutcome::Rejected;
        }
        let entries = data.len();
        state.store.install(data);
        drop(state);
        LogLine::info("SNAPSHOT_INSTALLED")
            .field("entries", entries)
            .field("view", view_number)
            .emit();
        SyncOutcome::Installed
    }

    // ==================
    // Diagnostics
    // ==================

    /// Full store dump. Test hook.
    pub fn dump(&self) -> HashMap<String, String> {
        self.lock_state().store.snapshot()
    }

    pub fn status(&self) -> ReplicaStatusPayload {
        let state = self.lock_state();
        ReplicaStatusPayload {
            address: self.my_address.clone(),
            role: state.role().as_str().to_string(),
            view: ViewPayload::from(state.known_view().clone()),
            store_entries: state.store.len() as u64,
            syncing: state.syncing,
            pending_writes: state.pending_len() as u64,
            last_known_backup: state.last_known_backup.clone().unwrap_or_default(),
            metrics: self.metrics.snapshot(),
            started_at: self.started_at.to_rfc3339(),
        }
    }

    // ==================
    // View installation & heartbeat loop
    // ==================

    /// Install a view learned from the monitor: adopt the derived role
    /// and, if the view designated a new backup, start a snapshot
    /// transfer in the background.
    pub fn install_view(self: Arc<Self>, view: crate::view::View) {
        let installation = self.lock_state().install_view(view);

        if let Some(role) = installation.role_changed {
            Event::RoleEntered.log().field("role", role.as_str()).emit();
        }
        if let Some(backup) = installation.sync_needed {
            tokio::spawn(async move { self.run_state_transfer(backup).await });
        }
    }

    /// Heartbeat the monitor once and install the returned view.
    pub async fn heartbeat_once(self: Arc<Self>) {
        let advertised = self.lock_state().known_view().number;

        match self
            .rpc
            .ping(&self.config.monitor_addr, &self.my_address, advertised)
            .await
        {
            Ok(view) => self.install_view(view),
            Err(err) => {
                // The monitor will come back or this process is doomed
                // anyway; keep heartbeating either way.
                LogLine::warn("MONITOR_UNREACHABLE")
                    .field("monitor", &self.config.monitor_addr)
                    .field("err", &err)
                    .emit();
            }
        }
    }

    /// Heartbeat forever, until the shutdown signal fires.
    pub async fn run_heartbeat(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.ping_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => Arc::clone(&self).heartbeat_once().await,
                _ = shutdown.changed() => break,
            }
        }
    }

    // ==================
    // Snapshot transfer
    // ==================

    /// Copy the full store to a newly designated backup, then drain the
    /// writes buffered while the copy was in flight.
    ///
    /// Holding the write slot across the whole transfer is the fence: no
    /// forwarded write can interleave with the snapshot, so the backup
    /// observes snapshot-then-writes in the primary's acceptance order.
    async fn run_state_transfer(self: Arc<Self>, backup: String) {
        let _slot = self.write_slot.lock().await;

        let (snapshot, view_number) = {
            let mut state = self.lock_state();
            let still_wanted = state.role() == Role::Primary
                && state.known_view().backup.as_deref() == Some(backup.as_str())
                && state.last_known_backup.as_deref() != Some(backup.as_str())
                && !state.syncing;
            if !still_wanted {
                return;
            }
            state.syncing = true;
            (state.store.snapshot(), state.known_view().number)
        };

        self.metrics.increment_transfers_started();
        Event::TransferStart
            .log()
            .field("backup", &backup)
            .field("entries", snapshot.len())
            .field("view", view_number)
            .emit();

        let result = self.rpc.sync_state(&backup, snapshot, view_number).await;
        let installed = matches!(&result, Ok(reply) if reply.err == ERR_NONE);

        let drained = {
            let mut state = self.lock_state();
            state.syncing = false;
            // Record the transfer only if the view still names this
            // backup; a view observed mid-transfer may have dropped it.
            let still_designated =
                state.known_view().backup.as_deref() == Some(backup.as_str());
            state.last_known_backup = (installed && still_designated).then(|| backup.clone());
            state.take_pending()
        };

        if installed {
            self.metrics.increment_transfers_completed();
            Event::TransferComplete.log().field("backup", &backup).emit();
        } else {
            self.metrics.increment_transfers_failed();
            let err = match result {
                Ok(reply) => reply.err,
                Err(err) => err.to_string(),
            };
            Event::TransferFailed
                .log()
                .field("backup", &backup)
                .field("err", err)
                .emit();
        }

        // Queued writes are applied regardless of the transfer outcome;
        // on failure the monitor repairs replication later.
        self.drain_pending(drained).await;
    }

    /// Replay buffered writes through the normal forward-then-apply path.
    /// Caller holds the write slot, so no new write can overtake these.
    async fn drain_pending(&self, drained: Vec<PendingWrite>) {
        for write in drained {
            let backup = {
                let state = self.lock_state();
                if state.role() != Role::Primary {
                    // Demoted mid-drain; the rest of the queue belongs to
                    // a tenure that no longer exists.
                    return;
                }
                state.known_view().backup.clone()
            };

            if let Some(backup) = backup.as_deref() {
                self.forward_to_backup(backup, &write.key, &write.value).await;
            }

            self.lock_state().store.put(&write.key, &write.value);
            self.metrics.increment_writes();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::View;

    fn service(addr: &str) -> Arc<ReplicaService> {
        let config = ReplicaConfig::new(addr, "127.0.0.1:1");
        Arc::new(ReplicaService::new(config, addr).unwrap())
    }

    fn install(service: &ReplicaService, number: u64, primary: &str, backup: &str) {
        let view = View {
            number,
            primary: (!primary.is_empty()).then(|| primary.to_string()),
            backup: (!backup.is_empty()).then(|| backup.to_string()),
        };
        service.lock_state().install_view(view);
    }

    #[test]
    fn test_idle_replica_serves_nothing() {
        let service = service("a:1");
        assert_eq!(service.get("k"), GetOutcome::NotPrimary);
        assert_eq!(service.forward_update("k", "v"), ForwardOutcome::NotBackup);
    }

    #[tokio::test]
    async fn test_idle_replica_rejects_writes() {
        let service = service("a:1");
        assert_eq!(service.put("k", "v").await, PutOutcome::NotPrimary);
    }

    #[tokio::test]
    async fn test_primary_without_backup_applies_locally() {
        let service = service("a:1");
        install(&service, 1, "a:1", "");

        assert_eq!(service.put("k", "v").await, PutOutcome::Applied);
        assert_eq!(service.get("k"), GetOutcome::Value("v".to_string()));
        assert_eq!(service.metrics().snapshot().writes_accepted, 1);
    }

    #[tokio::test]
    async fn test_second_write_wins() {
        let service = service("a:1");
        install(&service, 1, "a:1", "");

        service.put("k", "1").await;
        service.put("k", "2").await;
        assert_eq!(service.get("k"), GetOutcome::Value("2".to_string()));
    }

    #[test]
    fn test_get_missing_key() {
        let service = service("a:1");
        install(&service, 1, "a:1", "");
        assert_eq!(service.get("absent"), GetOutcome::NoKey);
    }

    #[test]
    fn test_backup_applies_forwarded_writes() {
        let service = service("b:2");
        install(&service, 2, "a:1", "b:2");

        assert_eq!(service.forward_update("k", "v"), ForwardOutcome::Applied);
        assert_eq!(service.dump().get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_backup_rejects_client_reads() {
        let service = service("b:2");
        install(&service, 2, "a:1", "b:2");
        assert_eq!(service.get("k"), GetOutcome::NotPrimary);
    }

    #[test]
    fn test_primary_rejects_forwarded_writes() {
        let service = service("a:1");
        install(&service, 1, "a:1", "");
        assert_eq!(service.forward_update("k", "v"), ForwardOutcome::NotBackup);
    }

    #[test]
    fn test_sync_installs_snapshot_at_backup() {
        let service = service("b:2");
        install(&service, 2, "a:1", "b:2");

        let mut data = HashMap::new();
        data.insert("a".to_string(), "1".to_string());
        assert_eq!(service.sync_state(data, 2), SyncOutcome::Installed);
        assert_eq!(service.dump().get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_sync_rejected_when_not_backup() {
        let service = service("c:3");
        install(&service, 2, "a:1", "b:2");

        let mut data = HashMap::new();
        data.insert("a".to_string(), "1".to_string());
        assert_eq!(service.sync_state(data, 2), SyncOutcome::Rejected);
        assert!(service.dump().is_empty());
    }

    #[tokio::test]
    async fn test_writes_queue_while_syncing() {
        let service = service("a:1");
        install(&service, 2, "a:1", "b:2");
        service.lock_state().syncing = true;

        assert_eq!(service.put("k", "v").await, PutOutcome::Queued);
        // Not yet applied locally.
        assert!(service.dump().is_empty());
        assert_eq!(service.lock_state().pending_len(), 1);
        assert_eq!(service.metrics().snapshot().writes_queued, 1);
    }

    #[tokio::test]
    async fn test_drain_applies_in_order() {
        let service = service("a:1");
        install(&service, 1, "a:1", "");
        service.lock_state().queue_write("k", "1");
        service.lock_state().queue_write("k", "2");

        let drained = service.lock_state().take_pending();
        service.drain_pending(drained).await;

        assert_eq!(service.get("k"), GetOutcome::Value("2".to_string()));
        assert_eq!(service.metrics().snapshot().writes_accepted, 2);
    }

    #[tokio::test]
    async fn test_drain_stops_after_demotion() {
        let service = service("a:1");
        install(&service, 1, "a:1", "");
        service.lock_state().queue_write("k", "1");

        let drained = service.lock_state().take_pending();
        install(&service, 2, "b:2", "");
        service.drain_pending(drained).await;

        assert!(service.dump().is_empty());
    }
}
