//! Monitor configuration
//!
//! Timing constants drive the failure detector:
//! - a replica is alive while its last heartbeat is at most `dead_interval`
//!   old (three missed 500ms heartbeats by default)
//! - the view is re-evaluated every `tick_interval`
//!
//! Configured from CLI flags, immutable after startup.

use super::errors::{MonitorError, MonitorResult};
use std::time::Duration;

/// Default listen address for the monitor.
pub const DEFAULT_MONITOR_ADDR: &str = "127.0.0.1:7070";
/// Default view re-evaluation cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);
/// Default heartbeat deadline: three missed 500ms heartbeats.
pub const DEFAULT_DEAD_INTERVAL: Duration = Duration::from_millis(1500);

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Address the monitor listens on.
    pub listen_addr: String,
    /// How often the view is re-evaluated.
    pub tick_interval: Duration,
    /// How stale a heartbeat may be before its sender counts as dead.
    pub dead_interval: Duration,
}

impl MonitorConfig {
    /// Configuration with default timing on the given address.
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            dead_interval: DEFAULT_DEAD_INTERVAL,
        }
    }

    /// Override the timing constants. Tests shrink these to keep scenario
    /// deadlines short.
    pub fn with_timing(mut self, tick_interval: Duration, dead_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self.dead_interval = dead_interval;
        self
    }

    /// Validate the configuration. Called once at startup; failures abort.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.listen_addr.is_empty() {
            return Err(MonitorError::InvalidConfig(
                "listen address must not be empty".to_string(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "tick interval must be non-zero".to_string(),
            ));
        }
        if self.dead_interval < self.tick_interval {
            return Err(MonitorError::InvalidConfig(
                "dead interval must be at least one tick interval".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MONITOR_ADDR)
    }
}
