//! View monitor
//!
//! The singleton process that tracks replica liveness by heartbeat and
//! publishes the totally ordered sequence of views:
//! - Exactly one primary per view; promotions only from acknowledged views
//! - A dead, unacknowledged primary freezes the view (safety over
//!   availability)
//! - Appointments are deterministic by registration order

mod config;
mod controller;
mod errors;
mod registry;
mod routes;
mod server;

pub use config::{
    MonitorConfig, DEFAULT_DEAD_INTERVAL, DEFAULT_MONITOR_ADDR, DEFAULT_TICK_INTERVAL,
};
pub use controller::{PingOutcome, TickOutcome, ViewChange, ViewChangeReason, ViewController};
pub use errors::{MonitorError, MonitorResult};
pub use registry::{ObservedPing, ReplicaRegistry};
pub use routes::{monitor_routes, MonitorState};
pub use server::MonitorServer;
