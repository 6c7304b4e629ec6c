//! RPC layer
//!
//! Wire types, error taxonomy, and the typed outbound HTTP client shared
//! by the monitor, the replicas, and the client library. The inbound side
//! of each RPC lives with its component (`monitor::routes`,
//! `replica::routes`).

mod client;
mod errors;
pub mod types;

pub use client::{RpcClient, DEFAULT_RPC_TIMEOUT};
pub use errors::{RpcError, RpcResult};
