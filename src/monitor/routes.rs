//! Monitor HTTP routes
//!
//! Endpoints:
//! - `POST /ping` — replica heartbeat; replies with the current view
//! - `GET /view` — read-only view lookup for clients
//! - `GET /status` — view, ack state, per-replica health, counters

use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::config::MonitorConfig;
use super::controller::{PingOutcome, ViewController};
use crate::observability::{Event, MetricsRegistry};
use crate::rpc::types::{MonitorStatusPayload, PingRequest, ViewPayload};

/// Shared state behind every monitor handler
pub struct MonitorState {
    controller: Mutex<ViewController>,
    metrics: MetricsRegistry,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl MonitorState {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            controller: Mutex::new(ViewController::new(config.dead_interval)),
            metrics: MetricsRegistry::new(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Run one heartbeat against the controller under the lock.
    pub fn handle_ping(&self, server_name: &str, view_number: u64) -> PingOutcome {
        self.metrics.increment_pings();
        let mut controller = self.controller.lock().expect("monitor lock poisoned");
        controller.handle_ping(server_name, view_number, Instant::now())
    }

    /// Snapshot the current view under the lock.
    pub fn current_view(&self) -> crate::view::View {
        let controller = self.controller.lock().expect("monitor lock poisoned");
        controller.current_view()
    }

    pub fn controller(&self) -> &Mutex<ViewController> {
        &self.controller
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    fn status(&self) -> MonitorStatusPayload {
        let controller = self.controller.lock().expect("monitor lock poisoned");
        MonitorStatusPayload {
            view: ViewPayload::from(controller.current_view()),
            primary_acked: controller.primary_acked(),
            replicas: controller.registry().health(Instant::now()),
            metrics: self.metrics.snapshot(),
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// Build the monitor router.
pub fn monitor_routes(state: Arc<MonitorState>) -> Router {
    Router::new()
        .route("/ping", post(ping_handler))
        .route("/view", get(view_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

async fn ping_handler(
    State(state): State<Arc<MonitorState>>,
    Json(request): Json<PingRequest>,
) -> Json<ViewPayload> {
    let outcome = state.handle_ping(&request.server_name, request.view_number);

    if outcome.newly_registered {
        Event::ReplicaRegistered
            .log()
            .field("replica", &request.server_name)
            .emit();
    }
    if outcome.restart_detected {
        Event::ReplicaRestartDetected
            .log()
            .field("replica", &request.server_name)
            .emit();
    }
    if outcome.acked_now {
        Event::PrimaryAcked
            .log()
            .field("primary", &request.server_name)
            .field("view", outcome.view.number)
            .emit();
    }

    Json(ViewPayload::from(outcome.view))
}

async fn view_handler(State(state): State<Arc<MonitorState>>) -> Json<ViewPayload> {
    Json(ViewPayload::from(state.current_view()))
}

async fn status_handler(State(state): State<Arc<MonitorState>>) -> Json<MonitorStatusPayload> {
    Json(state.status())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MonitorState {
        MonitorState::new(&MonitorConfig::default())
    }

    #[test]
    fn test_ping_registers_and_counts() {
        let state = state();
        let outcome = state.handle_ping("a:1", 0);
        assert!(outcome.newly_registered);
        assert_eq!(state.metrics().snapshot().pings_received, 1);
    }

    #[test]
    fn test_view_starts_empty() {
        let state = state();
        let view = state.current_view();
        assert_eq!(view.number, 0);
        assert!(view.primary.is_none());
    }

    #[test]
    fn test_status_reflects_registry() {
        let state = state();
        state.handle_ping("a:1", 0);
        state.handle_ping("b:2", 0);

        let status = state.status();
        assert_eq!(status.view.view_number, 0);
        assert!(status.primary_acked);
        assert_eq!(status.replicas.len(), 2);
        assert_eq!(status.metrics.pings_received, 2);
    }
}
