//! CLI error types
//!
//! Every failure surfaces as a JSON error envelope on stderr with a
//! stable machine-readable code and a human-readable message.

use crate::client::ClientError;
use crate::monitor::MonitorError;
use crate::replica::ReplicaError;
use crate::rpc::RpcError;
use thiserror::Error;

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// The async runtime could not be constructed
    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),

    /// The monitor failed to start or serve
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// The replica failed to start or serve
    #[error(transparent)]
    Replica(#[from] ReplicaError),

    /// A client-side operation failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A one-shot RPC failed
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl CliError {
    /// Stable machine-readable code for the error envelope.
    pub fn code_str(&self) -> &'static str {
        match self {
            CliError::Runtime(_) => "VIGIL_RUNTIME_FAILED",
            CliError::Monitor(_) => "VIGIL_MONITOR_FAILED",
            CliError::Replica(_) => "VIGIL_REPLICA_FAILED",
            CliError::Client(_) => "VIGIL_CLIENT_FAILED",
            CliError::Rpc(_) => "VIGIL_RPC_FAILED",
        }
    }

    /// Human-readable message for the error envelope.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err = CliError::Runtime(std::io::Error::from(std::io::ErrorKind::Other));
        assert_eq!(err.code_str(), "VIGIL_RUNTIME_FAILED");

        let err = CliError::Client(ClientError::Cancelled);
        assert_eq!(err.code_str(), "VIGIL_CLIENT_FAILED");
    }

    #[test]
    fn test_message_carries_cause() {
        let err = CliError::Monitor(MonitorError::InvalidConfig("bad tick".to_string()));
        assert!(err.message().contains("bad tick"));
    }
}
