//! Replica configuration
//!
//! A replica's identity is its advertised listen address; it must be
//! stable across the process lifetime. Configured from CLI flags,
//! immutable after startup.

use super::errors::{ReplicaError, ReplicaResult};
use crate::rpc::DEFAULT_RPC_TIMEOUT;
use std::time::Duration;

/// Default heartbeat cadence.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(500);

/// Replica configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaConfig {
    /// Address to listen on; also the replica's advertised identity.
    pub listen_addr: String,
    /// Address of the view monitor.
    pub monitor_addr: String,
    /// Heartbeat cadence.
    pub ping_interval: Duration,
    /// Timeout applied to every outbound RPC.
    pub rpc_timeout: Duration,
}

impl ReplicaConfig {
    pub fn new(listen_addr: impl Into<String>, monitor_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            monitor_addr: monitor_addr.into(),
            ping_interval: DEFAULT_PING_INTERVAL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// Override the timing constants. Tests shrink these.
    pub fn with_timing(mut self, ping_interval: Duration, rpc_timeout: Duration) -> Self {
        self.ping_interval = ping_interval;
        self.rpc_timeout = rpc_timeout;
        self
    }

    /// Validate the configuration. Called once at startup; failures abort.
    pub fn validate(&self) -> ReplicaResult<()> {
        if self.listen_addr.is_empty() {
            return Err(ReplicaError::InvalidConfig(
                "listen address must not be empty".to_string(),
            ));
        }
        if self.monitor_addr.is_empty() {
            return Err(ReplicaError::InvalidConfig(
                "monitor address must not be empty".to_string(),
            ));
        }
        if self.listen_addr == self.monitor_addr {
            return Err(ReplicaError::InvalidConfig(
                "replica and monitor cannot share an address".to_string(),
            ));
        }
        if self.ping_interval.is_zero() {
            return Err(ReplicaError::InvalidConfig(
                "ping interval must be non-zero".to_string(),
            ));
        }
        if self.rpc_timeout.is_zero() {
            return Err(ReplicaError::InvalidConfig(
                "rpc timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ReplicaConfig::new("127.0.0.1:4100", "127.0.0.1:7070");
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_empty_addresses_rejected() {
        assert!(ReplicaConfig::new("", "127.0.0.1:7070").validate().is_err());
        assert!(ReplicaConfig::new("127.0.0.1:4100", "").validate().is_err());
    }

    #[test]
    fn test_shared_address_rejected() {
        let config = ReplicaConfig::new("127.0.0.1:7070", "127.0.0.1:7070");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let base = ReplicaConfig::new("127.0.0.1:4100", "127.0.0.1:7070");
        assert!(base
            .clone()
            .with_timing(Duration::ZERO, Duration::from_millis(200))
            .validate()
            .is_err());
        assert!(base
            .with_timing(Duration::from_millis(500), Duration::ZERO)
            .validate()
            .is_err());
    }
}
