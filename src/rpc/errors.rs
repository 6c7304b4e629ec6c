//! RPC transport errors

use thiserror::Error;

/// Result type for RPC calls
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors crossing the RPC client boundary.
///
/// Callers do not distinguish the variants: any transport failure means
/// "treat the peer as gone and let the view mechanism repair".
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection refused, reset, timeout, or malformed body
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The peer answered with a non-success HTTP status
    #[error("unexpected http status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },
}

impl RpcError {
    /// True when the failure was a timeout, as opposed to a refused or
    /// reset connection.
    pub fn is_timeout(&self) -> bool {
        match self {
            RpcError::Transport(err) => err.is_timeout(),
            RpcError::UnexpectedStatus { .. } => false,
        }
    }
}
