//! Replica HTTP routes
//!
//! Client-facing endpoints under `/kv`, peer-facing endpoints under
//! `/cluster`, and the status surface. Application outcomes travel in the
//! reply's `err` field; the HTTP status is 200 for every served request.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::service::{ForwardOutcome, GetOutcome, PutOutcome, ReplicaService, SyncOutcome};
use crate::rpc::types::{
    DumpReply, ForwardReply, ForwardRequest, GetReply, GetRequest, PutReply, PutRequest,
    ReplicaStatusPayload, SyncReply, SyncRequest, ERR_NONE, ERR_NOT_PRIMARY, ERR_NO_KEY,
};

/// Build the replica router.
pub fn replica_routes(service: Arc<ReplicaService>) -> Router {
    Router::new()
        // Client operations
        .route("/kv/get", post(get_handler))
        .route("/kv/put", post(put_handler))
        // Peer operations
        .route("/cluster/forward", post(forward_handler))
        .route("/cluster/sync", post(sync_handler))
        // Diagnostics
        .route("/cluster/dump", get(dump_handler))
        .route("/status", get(status_handler))
        .with_state(service)
}

async fn get_handler(
    State(service): State<Arc<ReplicaService>>,
    Json(request): Json<GetRequest>,
) -> Json<GetReply> {
    let reply = match service.get(&request.key) {
        GetOutcome::Value(value) => GetReply {
            value,
            err: ERR_NONE.to_string(),
        },
        GetOutcome::NoKey => GetReply {
            value: String::new(),
            err: ERR_NO_KEY.to_string(),
        },
        GetOutcome::NotPrimary => GetReply {
            value: String::new(),
            err: ERR_NOT_PRIMARY.to_string(),
        },
    };
    Json(reply)
}

async fn put_handler(
    State(service): State<Arc<ReplicaService>>,
    Json(request): Json<PutRequest>,
) -> Json<PutReply> {
    let err = match service.put(&request.key, &request.value).await {
        PutOutcome::Applied | PutOutcome::Queued => ERR_NONE,
        PutOutcome::NotPrimary => ERR_NOT_PRIMARY,
    };
    Json(PutReply {
        err: err.to_string(),
    })
}

async fn forward_handler(
    State(service): State<Arc<ReplicaService>>,
    Json(request): Json<ForwardRequest>,
) -> Json<ForwardReply> {
    let err = match service.forward_update(&request.key, &request.value) {
        ForwardOutcome::Applied => ERR_NONE,
        ForwardOutcome::NotBackup => ERR_NOT_PRIMARY,
    };
    Json(ForwardReply {
        err: err.to_string(),
    })
}

async fn sync_handler(
    State(service): State<Arc<ReplicaService>>,
    Json(request): Json<SyncRequest>,
) -> Json<SyncReply> {
    let err = match service.sync_state(request.data, request.view_number) {
        SyncOutcome::Installed => ERR_NONE,
        SyncOutcome::Rejected => ERR_NOT_PRIMARY,
    };
    Json(SyncReply {
        err: err.to_string(),
    })
}

async fn dump_handler(State(service): State<Arc<ReplicaService>>) -> Json<DumpReply> {
    Json(DumpReply {
        data: service.dump(),
    })
}

async fn status_handler(
    State(service): State<Arc<ReplicaService>>,
) -> Json<ReplicaStatusPayload> {
    Json(service.status())
}
