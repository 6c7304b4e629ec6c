//! Client library error types

use crate::rpc::RpcError;
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Client library errors
///
/// Transient failures never surface: the library retries until the
/// service comes back. Only cancellation and construction failures reach
/// the caller.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The embedding application cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// The underlying HTTP client could not be constructed
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_display() {
        assert_eq!(ClientError::Cancelled.to_string(), "operation cancelled");
    }
}
