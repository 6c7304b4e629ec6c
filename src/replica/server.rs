//! Replica server
//!
//! Binds the listen socket first so the actual bound address can serve as
//! the replica's advertised identity, then runs the HTTP service and the
//! heartbeat loop until the shutdown signal fires.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use super::config::ReplicaConfig;
use super::errors::{ReplicaError, ReplicaResult};
use super::routes::replica_routes;
use super::service::ReplicaService;
use crate::observability::Event;

/// A bound, not-yet-serving replica
pub struct ReplicaServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    service: Arc<ReplicaService>,
}

impl ReplicaServer {
    /// Validate the configuration and bind the listen socket. The bound
    /// address becomes the replica's identity.
    pub async fn bind(config: ReplicaConfig) -> ReplicaResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|source| ReplicaError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ReplicaError::Serve)?;
        let service = Arc::new(ReplicaService::new(config, local_addr.to_string())?);
        Ok(Self {
            listener,
            local_addr,
            service,
        })
    }

    /// The actual bound address. Differs from the configured one when the
    /// configuration asked for port 0.
    pub fn local_addr(&self) -> String {
        self.local_addr.to_string()
    }

    pub fn service(&self) -> Arc<ReplicaService> {
        self.service.clone()
    }

    /// Serve until the shutdown signal fires.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> ReplicaResult<()> {
        let addr = self.local_addr();
        Event::ReplicaBootStart.log().field("listen", &addr).emit();

        let heartbeat_task = tokio::spawn(
            self.service
                .clone()
                .run_heartbeat(shutdown.clone()),
        );

        let router = replica_routes(self.service.clone());
        Event::ReplicaBootComplete.log().field("listen", &addr).emit();

        let mut serve_shutdown = shutdown;
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                let _ = serve_shutdown.changed().await;
                Event::ShutdownStart.log().field("component", "replica").emit();
            })
            .await
            .map_err(ReplicaError::Serve)?;

        let _ = heartbeat_task.await;
        Event::ShutdownComplete.log().field("component", "replica").emit();
        Ok(())
    }

    /// Bind and serve until interrupted.
    pub async fn run(config: ReplicaConfig) -> ReplicaResult<()> {
        let server = Self::bind(config).await?;
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = tx.send(true);
        });
        server.serve(rx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_on_ephemeral_port_fixes_identity() {
        let config = ReplicaConfig::new("127.0.0.1:0", "127.0.0.1:7070");
        let server = ReplicaServer::bind(config).await.unwrap();

        let addr = server.local_addr();
        assert!(!addr.ends_with(":0"));
        assert_eq!(server.service().my_address(), addr);
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = ReplicaConfig::new("", "127.0.0.1:7070");
        assert!(ReplicaServer::bind(config).await.is_err());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        // Monitor address is unreachable; the heartbeat loop just logs
        // and keeps going, which must not block shutdown.
        let config = ReplicaConfig::new("127.0.0.1:0", "127.0.0.1:1")
            .with_timing(
                std::time::Duration::from_millis(50),
                std::time::Duration::from_millis(50),
            );
        let server = ReplicaServer::bind(config).await.unwrap();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(server.serve(rx));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        assert!(result.is_ok());
    }
}
