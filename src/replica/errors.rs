//! Replica error types

use crate::rpc::RpcError;
use thiserror::Error;

/// Result type for replica operations
pub type ReplicaResult<T> = Result<T, ReplicaError>;

/// Replica errors
///
/// Only startup can fail fatally. Runtime irregularities (unreachable
/// monitor, dead backup, role confusion) are absorbed by the view
/// mechanism and never surface as errors.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// Configuration rejected at startup
    #[error("invalid replica configuration: {0}")]
    InvalidConfig(String),

    /// The listen socket could not be bound (fatal)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The accept loop failed after startup
    #[error("replica server failed: {0}")]
    Serve(std::io::Error),

    /// The outbound RPC client could not be constructed
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_address() {
        let err = ReplicaError::Bind {
            addr: "127.0.0.1:4100".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().contains("127.0.0.1:4100"));
    }
}
