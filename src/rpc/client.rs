//! Typed HTTP client for all outbound RPCs
//!
//! One client type covers every caller: replicas heartbeating the monitor,
//! the primary forwarding to its backup, and the client library talking to
//! the primary. Every request carries the same short timeout so a hung peer
//! cannot wedge the caller; a timeout is handled exactly like a dead peer.

use super::errors::{RpcError, RpcResult};
use super::types::{
    DumpReply, ForwardReply, ForwardRequest, GetReply, GetRequest, MonitorStatusPayload,
    PingRequest, PutReply, PutRequest, ReplicaStatusPayload, SyncReply, SyncRequest, ViewPayload,
};
use crate::view::View;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default per-request timeout. Kept under half the heartbeat interval so
/// a wedged peer is indistinguishable from a dead one within one beat.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_millis(200);

/// Thin typed wrapper over a pooled HTTP client
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
}

impl RpcClient {
    /// Create a client with the default request timeout.
    pub fn new() -> RpcResult<Self> {
        Self::with_timeout(DEFAULT_RPC_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> RpcResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    // ==================
    // Monitor RPCs
    // ==================

    /// Heartbeat the monitor and learn the latest view.
    pub async fn ping(
        &self,
        monitor: &str,
        server_name: &str,
        view_number: u64,
    ) -> RpcResult<View> {
        let request = PingRequest {
            server_name: server_name.to_string(),
            view_number,
        };
        let payload: ViewPayload = self.post_json(monitor, "/ping", &request).await?;
        Ok(payload.into_view())
    }

    /// Read the monitor's current view without heartbeating.
    pub async fn get_view(&self, monitor: &str) -> RpcResult<View> {
        let payload: ViewPayload = self.get_json(monitor, "/view").await?;
        Ok(payload.into_view())
    }

    /// Fetch the monitor's status surface.
    pub async fn monitor_status(&self, monitor: &str) -> RpcResult<MonitorStatusPayload> {
        self.get_json(monitor, "/status").await
    }

    // ==================
    // Primary RPCs
    // ==================

    /// Read a key from the primary.
    pub async fn get(&self, primary: &str, key: &str) -> RpcResult<GetReply> {
        let request = GetRequest {
            key: key.to_string(),
        };
        self.post_json(primary, "/kv/get", &request).await
    }

    /// Write a key at the primary.
    pub async fn put(&self, primary: &str, key: &str, value: &str) -> RpcResult<PutReply> {
        let request = PutRequest {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.post_json(primary, "/kv/put", &request).await
    }

    // ==================
    // Backup RPCs
    // ==================

    /// Relay a single accepted write to the backup.
    pub async fn forward_update(
        &self,
        backup: &str,
        key: &str,
        value: &str,
    ) -> RpcResult<ForwardReply> {
        let request = ForwardRequest {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.post_json(backup, "/cluster/forward", &request).await
    }

    /// Install a full store snapshot at a newly designated backup.
    pub async fn sync_state(
        &self,
        backup: &str,
        data: HashMap<String, String>,
        view_number: u64,
    ) -> RpcResult<SyncReply> {
        let request = SyncRequest { data, view_number };
        self.post_json(backup, "/cluster/sync", &request).await
    }

    // ==================
    // Diagnostics
    // ==================

    /// Dump a replica's full store. Test hook.
    pub async fn dump(&self, replica: &str) -> RpcResult<HashMap<String, String>> {
        let reply: DumpReply = self.get_json(replica, "/cluster/dump").await?;
        Ok(reply.data)
    }

    /// Fetch a replica's status surface.
    pub async fn replica_status(&self, replica: &str) -> RpcResult<ReplicaStatusPayload> {
        self.get_json(replica, "/status").await
    }

    // ==================
    // Transport helpers
    // ==================

    async fn post_json<Req, Resp>(&self, addr: &str, path: &str, body: &Req) -> RpcResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let endpoint = format!("http://{}{}", addr, path);
        let response = self.http.post(&endpoint).json(body).send().await?;
        Self::decode(endpoint, response).await
    }

    async fn get_json<Resp>(&self, addr: &str, path: &str) -> RpcResult<Resp>
    where
        Resp: DeserializeOwned,
    {
        let endpoint = format!("http://{}{}", addr, path);
        let response = self.http.get(&endpoint).send().await?;
        Self::decode(endpoint, response).await
    }

    async fn decode<Resp>(endpoint: String, response: reqwest::Response) -> RpcResult<Resp>
    where
        Resp: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::UnexpectedStatus {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_under_half_heartbeat() {
        // Heartbeat interval defaults to 500ms; the request timeout must
        // stay at or under half of it.
        assert!(DEFAULT_RPC_TIMEOUT <= Duration::from_millis(250));
    }

    #[test]
    fn test_client_construction() {
        assert!(RpcClient::new().is_ok());
        assert!(RpcClient::with_timeout(Duration::from_millis(50)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_transport_error() {
        let client = RpcClient::with_timeout(Duration::from_millis(100)).unwrap();
        // Reserved port with nothing listening.
        let err = client.get_view("127.0.0.1:1").await.unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
    }
}
