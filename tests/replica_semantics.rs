//! Replica semantics tests
//!
//! Exercise the replica's RPC surface over real HTTP on ephemeral ports:
//! role admission, read-your-writes at the primary, forwarded writes,
//! snapshot transfer to a fresh backup, and the diagnostics surface.
//!
//! Views are fed to the services directly, standing in for the monitor's
//! heartbeat replies; no monitor runs here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use vigilkv::replica::{ReplicaConfig, ReplicaServer, ReplicaService};
use vigilkv::rpc::types::{ERR_NONE, ERR_NOT_PRIMARY, ERR_NO_KEY};
use vigilkv::rpc::RpcClient;
use vigilkv::view::View;

/// A replica with no live monitor. The heartbeat loop fails fast against
/// the unroutable monitor address and is quiet for the test's lifetime.
async fn start_replica() -> (String, Arc<ReplicaService>, watch::Sender<bool>) {
    let config = ReplicaConfig::new("127.0.0.1:0", "127.0.0.1:1")
        .with_timing(Duration::from_secs(60), Duration::from_millis(200));
    let server = ReplicaServer::bind(config).await.expect("bind replica");
    let addr = server.local_addr();
    let service = server.service();

    let (tx, rx) = watch::channel(false);
    tokio::spawn(server.serve(rx));
    (addr, service, tx)
}

fn view(number: u64, primary: &str, backup: &str) -> View {
    View {
        number,
        primary: (!primary.is_empty()).then(|| primary.to_string()),
        backup: (!backup.is_empty()).then(|| backup.to_string()),
    }
}

fn rpc() -> RpcClient {
    RpcClient::with_timeout(Duration::from_millis(500)).expect("build rpc client")
}

/// Poll a replica's dump until it equals `expected`.
async fn wait_for_store(rpc: &RpcClient, replica: &str, expected: &HashMap<String, String>) {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(dump) = rpc.dump(replica).await {
            if &dump == expected {
                return;
            }
        }
        assert!(
            Instant::now() < deadline,
            "store at {} did not converge to {:?}",
            replica,
            expected
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn pairs(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// =============================================================================
// Role admission
// =============================================================================

/// A replica that holds no role serves nothing.
#[tokio::test]
async fn test_idle_replica_rejects_everything() {
    let (addr, _service, _tx) = start_replica().await;
    let rpc = rpc();

    let get = rpc.get(&addr, "k").await.unwrap();
    assert_eq!(get.err, ERR_NOT_PRIMARY);

    let put = rpc.put(&addr, "k", "v").await.unwrap();
    assert_eq!(put.err, ERR_NOT_PRIMARY);

    let forward = rpc.forward_update(&addr, "k", "v").await.unwrap();
    assert_eq!(forward.err, ERR_NOT_PRIMARY);

    let sync = rpc.sync_state(&addr, HashMap::new(), 1).await.unwrap();
    assert_eq!(sync.err, ERR_NOT_PRIMARY);
}

/// The backup role admits forwarded writes and snapshots but still
/// rejects client operations.
#[tokio::test]
async fn test_backup_admits_replication_only() {
    let (addr, service, _tx) = start_replica().await;
    service.clone().install_view(view(2, "elsewhere:1", &addr));
    let rpc = rpc();

    let get = rpc.get(&addr, "k").await.unwrap();
    assert_eq!(get.err, ERR_NOT_PRIMARY);

    let forward = rpc.forward_update(&addr, "k", "v").await.unwrap();
    assert_eq!(forward.err, ERR_NONE);

    assert_eq!(rpc.dump(&addr).await.unwrap(), pairs(&[("k", "v")]));
}

/// A primary demoted by a later view stops serving immediately.
#[tokio::test]
async fn test_demoted_primary_stops_serving() {
    let (addr, service, _tx) = start_replica().await;
    let rpc = rpc();

    service.clone().install_view(view(1, &addr, ""));
    assert_eq!(rpc.put(&addr, "k", "v").await.unwrap().err, ERR_NONE);

    service.clone().install_view(view(2, "elsewhere:1", ""));
    assert_eq!(rpc.put(&addr, "k", "v").await.unwrap().err, ERR_NOT_PRIMARY);
    assert_eq!(rpc.get(&addr, "k").await.unwrap().err, ERR_NOT_PRIMARY);
}

// =============================================================================
// Primary semantics
// =============================================================================

/// Writes land and read back; a missing key reads as no-key.
#[tokio::test]
async fn test_round_trip_and_missing_key() {
    let (addr, service, _tx) = start_replica().await;
    service.clone().install_view(view(1, &addr, ""));
    let rpc = rpc();

    assert_eq!(rpc.put(&addr, "color", "blue").await.unwrap().err, ERR_NONE);

    let get = rpc.get(&addr, "color").await.unwrap();
    assert_eq!(get.err, ERR_NONE);
    assert_eq!(get.value, "blue");

    let missing = rpc.get(&addr, "absent").await.unwrap();
    assert_eq!(missing.err, ERR_NO_KEY);
    assert_eq!(missing.value, "");
}

/// Two writes to the same key settle on the second value.
#[tokio::test]
async fn test_second_write_wins() {
    let (addr, service, _tx) = start_replica().await;
    service.clone().install_view(view(1, &addr, ""));
    let rpc = rpc();

    rpc.put(&addr, "k", "1").await.unwrap();
    rpc.put(&addr, "k", "2").await.unwrap();

    let get = rpc.get(&addr, "k").await.unwrap();
    assert_eq!(get.value, "2");
}

/// Accepted writes reach the backup before the client acknowledgement,
/// so the backup's dump trails the primary by nothing.
#[tokio::test]
async fn test_writes_forwarded_to_backup() {
    let (primary_addr, primary, _ptx) = start_replica().await;
    let (backup_addr, backup, _btx) = start_replica().await;
    let rpc = rpc();

    backup.clone().install_view(view(2, &primary_addr, &backup_addr));
    primary.clone().install_view(view(1, &primary_addr, ""));
    // Pre-existing data before the backup joined.
    rpc.put(&primary_addr, "a", "1").await.unwrap();

    primary.clone().install_view(view(2, &primary_addr, &backup_addr));
    // The new backup receives the snapshot of existing data.
    wait_for_store(&rpc, &backup_addr, &pairs(&[("a", "1")])).await;

    // Subsequent writes flow through the forward path.
    assert_eq!(rpc.put(&primary_addr, "b", "2").await.unwrap().err, ERR_NONE);
    assert_eq!(
        rpc.dump(&backup_addr).await.unwrap(),
        pairs(&[("a", "1"), ("b", "2")])
    );
    assert_eq!(
        rpc.dump(&primary_addr).await.unwrap(),
        pairs(&[("a", "1"), ("b", "2")])
    );
}

/// A snapshot transfer to a backup that does not yet know its role fails
/// cleanly and is retried on the next view observation.
#[tokio::test]
async fn test_transfer_retries_until_backup_learns_role() {
    let (primary_addr, primary, _ptx) = start_replica().await;
    let (backup_addr, backup, _btx) = start_replica().await;
    let rpc = rpc();

    primary.clone().install_view(view(1, &primary_addr, ""));
    rpc.put(&primary_addr, "a", "1").await.unwrap();

    // The primary learns of the backup first; the transfer is rejected.
    primary.clone().install_view(view(2, &primary_addr, &backup_addr));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rpc.dump(&backup_addr).await.unwrap().is_empty());

    // The backup learns its role; the next heartbeat observation of the
    // same view retries the transfer.
    backup.clone().install_view(view(2, &primary_addr, &backup_addr));
    primary.clone().install_view(view(2, &primary_addr, &backup_addr));
    wait_for_store(&rpc, &backup_addr, &pairs(&[("a", "1")])).await;
}

/// Forwarded updates are last-writer-wins, so re-delivery cannot change
/// the outcome.
#[tokio::test]
async fn test_forward_redelivery_is_idempotent() {
    let (addr, service, _tx) = start_replica().await;
    service.clone().install_view(view(2, "elsewhere:1", &addr));
    let rpc = rpc();

    rpc.forward_update(&addr, "k", "v").await.unwrap();
    rpc.forward_update(&addr, "k", "v").await.unwrap();

    assert_eq!(rpc.dump(&addr).await.unwrap(), pairs(&[("k", "v")]));
}

// =============================================================================
// Diagnostics
// =============================================================================

/// The status surface reports role, view, and store size truthfully.
#[tokio::test]
async fn test_status_surface() {
    let (addr, service, _tx) = start_replica().await;
    let rpc = rpc();

    let status = rpc.replica_status(&addr).await.unwrap();
    assert_eq!(status.role, "idle");
    assert_eq!(status.view.view_number, 0);
    assert_eq!(status.store_entries, 0);
    assert_eq!(status.address, addr);

    service.clone().install_view(view(1, &addr, ""));
    rpc.put(&addr, "k", "v").await.unwrap();

    let status = rpc.replica_status(&addr).await.unwrap();
    assert_eq!(status.role, "primary");
    assert_eq!(status.view.view_number, 1);
    assert_eq!(status.store_entries, 1);
    assert!(!status.syncing);
    assert_eq!(status.metrics.writes_accepted, 1);
}
