//! Monitor error types

use thiserror::Error;

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Monitor errors
///
/// The only fatal condition is failing to bind the listen socket; every
/// protocol-level irregularity is absorbed by the view mechanism instead
/// of surfacing as an error.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Configuration rejected at startup
    #[error("invalid monitor configuration: {0}")]
    InvalidConfig(String),

    /// The listen socket could not be bound (fatal)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The accept loop failed after startup
    #[error("monitor server failed: {0}")]
    Serve(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_address() {
        let err = MonitorError::Bind {
            addr: "127.0.0.1:7070".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().contains("127.0.0.1:7070"));
    }

    #[test]
    fn test_invalid_config_display() {
        let err = MonitorError::InvalidConfig("tick interval must be non-zero".to_string());
        assert!(err.to_string().contains("tick interval"));
    }
}
