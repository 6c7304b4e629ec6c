//! vigilkv - a fault-tolerant primary/backup key-value store
//!
//! A singleton view monitor tracks replica liveness by heartbeat and
//! publishes a totally ordered sequence of views; replicas learn their
//! roles from the views, and the primary replicates every write to the
//! backup before acknowledging the client.

pub mod cli;
pub mod client;
pub mod monitor;
pub mod observability;
pub mod replica;
pub mod rpc;
pub mod view;
