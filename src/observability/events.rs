//! Lifecycle events
//!
//! Every observable state change in the monitor and the replicas has a
//! typed event. Events are explicit; free-form log messages are not used
//! for lifecycle changes.

use super::logger::LogLine;
use std::fmt;

/// Observable lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & lifecycle
    /// Monitor startup begins
    MonitorBootStart,
    /// Monitor is serving and ticking
    MonitorBootComplete,
    /// Replica startup begins
    ReplicaBootStart,
    /// Replica is serving and heartbeating
    ReplicaBootComplete,
    /// Shutdown signal received
    ShutdownStart,
    /// Listener closed, tasks drained
    ShutdownComplete,

    // Monitor
    /// A previously unknown replica sent its first heartbeat
    ReplicaRegistered,
    /// A role-holding replica heartbeated with view number 0: its process
    /// restarted and lost its store
    ReplicaRestartDetected,
    /// The standing primary acknowledged the current view
    PrimaryAcked,
    /// A new view was published
    ViewAdvanced,
    /// A dead primary could not be replaced because the view is unacked
    ViewChangeBlocked,

    // Replica
    /// The replica's role under the latest view changed
    RoleEntered,
    /// Snapshot transfer to a new backup started
    TransferStart,
    /// Snapshot transfer completed and queued writes drained
    TransferComplete,
    /// Snapshot transfer failed; it is retried on a later heartbeat
    TransferFailed,
    /// A forwarded write was rejected or lost; the monitor will repair
    ForwardFailed,
    /// A write was queued behind an in-flight snapshot transfer
    WriteQueued,
}

impl Event {
    /// Returns the event name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::MonitorBootStart => "MONITOR_BOOT_START",
            Event::MonitorBootComplete => "MONITOR_BOOT_COMPLETE",
            Event::ReplicaBootStart => "REPLICA_BOOT_START",
            Event::ReplicaBootComplete => "REPLICA_BOOT_COMPLETE",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::ReplicaRegistered => "REPLICA_REGISTERED",
            Event::ReplicaRestartDetected => "REPLICA_RESTART_DETECTED",
            Event::PrimaryAcked => "PRIMARY_ACKED",
            Event::ViewAdvanced => "VIEW_ADVANCED",
            Event::ViewChangeBlocked => "VIEW_CHANGE_BLOCKED",
            Event::RoleEntered => "ROLE_ENTERED",
            Event::TransferStart => "TRANSFER_START",
            Event::TransferComplete => "TRANSFER_COMPLETE",
            Event::TransferFailed => "TRANSFER_FAILED",
            Event::ForwardFailed => "FORWARD_FAILED",
            Event::WriteQueued => "WRITE_QUEUED",
        }
    }

    /// Events that indicate degraded operation and log as warnings.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Event::ReplicaRestartDetected
                | Event::ViewChangeBlocked
                | Event::TransferFailed
                | Event::ForwardFailed
        )
    }

    /// Start a log line for this event at its natural severity.
    pub fn log(self) -> LogLine {
        if self.is_degraded() {
            LogLine::warn(self.as_str())
        } else {
            LogLine::info(self.as_str())
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
