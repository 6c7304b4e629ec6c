//! Monitor server
//!
//! Binds the listen socket, runs the HTTP service and the periodic tick
//! loop, and shuts both down when the shutdown signal fires. Failing to
//! bind is the only fatal startup error.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tokio::sync::watch;

use super::config::MonitorConfig;
use super::controller::{TickOutcome, ViewChange};
use super::errors::{MonitorError, MonitorResult};
use super::routes::{monitor_routes, MonitorState};
use crate::observability::Event;

/// A bound, not-yet-serving monitor
pub struct MonitorServer {
    config: MonitorConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<MonitorState>,
}

impl MonitorServer {
    /// Validate the configuration and bind the listen socket.
    pub async fn bind(config: MonitorConfig) -> MonitorResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|source| MonitorError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(MonitorError::Serve)?;
        let state = Arc::new(MonitorState::new(&config));
        Ok(Self {
            config,
            listener,
            local_addr,
            state,
        })
    }

    /// The actual bound address. Differs from the configured one when the
    /// configuration asked for port 0.
    pub fn local_addr(&self) -> String {
        self.local_addr.to_string()
    }

    pub fn state(&self) -> Arc<MonitorState> {
        self.state.clone()
    }

    /// Serve until the shutdown signal fires.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> MonitorResult<()> {
        let addr = self.local_addr();
        Event::MonitorBootStart.log().field("listen", &addr).emit();

        let tick_task = tokio::spawn(run_tick_loop(
            self.state.clone(),
            self.config.tick_interval,
            shutdown.clone(),
        ));

        let router = monitor_routes(self.state.clone());
        Event::MonitorBootComplete.log().field("listen", &addr).emit();

        let mut serve_shutdown = shutdown;
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                let _ = serve_shutdown.changed().await;
                Event::ShutdownStart.log().field("component", "monitor").emit();
            })
            .await
            .map_err(MonitorError::Serve)?;

        let _ = tick_task.await;
        Event::ShutdownComplete.log().field("component", "monitor").emit();
        Ok(())
    }

    /// Bind and serve until interrupted.
    pub async fn run(config: MonitorConfig) -> MonitorResult<()> {
        let server = Self::bind(config).await?;
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = tx.send(true);
        });
        server.serve(rx).await
    }
}

async fn run_tick_loop(
    state: Arc<MonitorState>,
    tick_interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = {
                    let mut controller = state
                        .controller()
                        .lock()
                        .expect("monitor lock poisoned");
                    controller.tick(Instant::now())
                };
                match outcome {
                    TickOutcome::Idle => {}
                    TickOutcome::Advanced(change) => {
                        state.metrics().increment_views_advanced();
                        log_view_change(&change);
                    }
                    TickOutcome::Blocked => {
                        Event::ViewChangeBlocked.log().emit();
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

fn log_view_change(change: &ViewChange) {
    Event::ViewAdvanced
        .log()
        .field("view", change.view.number)
        .field("primary", change.view.primary.as_deref().unwrap_or(""))
        .field("backup", change.view.backup.as_deref().unwrap_or(""))
        .field("reason", change.reason.as_str())
        .emit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_on_ephemeral_port() {
        let config = MonitorConfig::new("127.0.0.1:0");
        let server = MonitorServer::bind(config).await.unwrap();
        let addr = server.local_addr();
        assert!(addr.starts_with("127.0.0.1:"));
        assert!(!addr.ends_with(":0"));
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = MonitorConfig::new("");
        assert!(MonitorServer::bind(config).await.is_err());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let config = MonitorConfig::new("127.0.0.1:0");
        let server = MonitorServer::bind(config).await.unwrap();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(server.serve(rx));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        assert!(result.is_ok());
    }
}
