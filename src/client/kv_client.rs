//! Retrying key-value client
//!
//! Routing contract:
//! 1. Resolve the primary through the monitor and cache it
//! 2. Send the operation to the cached primary
//! 3. On transport failure or a not-primary reply, drop the cache, back
//!    off briefly, and retry
//!
//! Retries are unbounded; the library assumes the service eventually
//! recovers. A write retried across a view change may be applied twice,
//! which is indistinguishable from once because assignment is
//! last-writer-wins per key. Embedders pass a cancellation signal to
//! bound a stuck call.

use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;

use super::errors::{ClientError, ClientResult};
use crate::rpc::types::{ERR_NONE, ERR_NO_KEY};
use crate::rpc::RpcClient;

/// Default pause between retries, matched to the heartbeat cadence: a
/// view change takes at least one heartbeat to become visible.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// A key-value client bound to one monitor
pub struct KvClient {
    rpc: RpcClient,
    monitor_addr: String,
    cached_primary: Mutex<Option<String>>,
    backoff: Duration,
    cancel: Option<watch::Receiver<bool>>,
}

impl KvClient {
    pub fn new(monitor_addr: impl Into<String>) -> ClientResult<Self> {
        Ok(Self {
            rpc: RpcClient::new()?,
            monitor_addr: monitor_addr.into(),
            cached_primary: Mutex::new(None),
            backoff: DEFAULT_RETRY_BACKOFF,
            cancel: None,
        })
    }

    /// Override the retry pause. Tests shrink this.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Attach a cancellation signal; when it flips to `true`, in-flight
    /// operations return `ClientError::Cancelled` at the next retry point.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Read a key. Returns `None` when the key does not exist.
    pub async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        loop {
            let primary = self.resolve_primary().await?;
            match self.rpc.get(&primary, key).await {
                Ok(reply) if reply.err == ERR_NONE => return Ok(Some(reply.value)),
                Ok(reply) if reply.err == ERR_NO_KEY => return Ok(None),
                _ => self.retry_after_failure().await?,
            }
        }
    }

    /// Write a key. Returns once the primary acknowledged the write.
    pub async fn put(&self, key: &str, value: &str) -> ClientResult<()> {
        loop {
            let primary = self.resolve_primary().await?;
            match self.rpc.put(&primary, key, value).await {
                Ok(reply) if reply.err == ERR_NONE => return Ok(()),
                _ => self.retry_after_failure().await?,
            }
        }
    }

    /// Cached primary, or ask the monitor until a view names one.
    async fn resolve_primary(&self) -> ClientResult<String> {
        loop {
            self.check_cancelled()?;

            if let Some(primary) = self.cached() {
                return Ok(primary);
            }

            match self.rpc.get_view(&self.monitor_addr).await {
                Ok(view) => {
                    if let Some(primary) = view.primary {
                        *self.cached_primary.lock().expect("client lock poisoned") =
                            Some(primary.clone());
                        return Ok(primary);
                    }
                }
                Err(_) => {}
            }

            // No view, or a view without a primary. Wait for the monitor
            // to appoint one.
            self.pause().await?;
        }
    }

    async fn retry_after_failure(&self) -> ClientResult<()> {
        *self.cached_primary.lock().expect("client lock poisoned") = None;
        self.pause().await
    }

    fn cached(&self) -> Option<String> {
        self.cached_primary
            .lock()
            .expect("client lock poisoned")
            .clone()
    }

    fn check_cancelled(&self) -> ClientResult<()> {
        match &self.cancel {
            Some(cancel) if *cancel.borrow() => Err(ClientError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Jittered pause, interruptible by cancellation.
    async fn pause(&self) -> ClientResult<()> {
        self.check_cancelled()?;
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let wait = self.backoff.mul_f64(jitter);

        match self.cancel.clone() {
            Some(mut cancel) => {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => Ok(()),
                    _ = cancel.changed() => Err(ClientError::Cancelled),
                }
            }
            None => {
                tokio::time::sleep(wait).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_matches_heartbeat_cadence() {
        assert_eq!(DEFAULT_RETRY_BACKOFF, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_retry_loop() {
        // Monitor address is unreachable, so the client would retry
        // forever without the cancellation signal.
        let (tx, rx) = watch::channel(false);
        let client = KvClient::new("127.0.0.1:1")
            .unwrap()
            .with_backoff(Duration::from_millis(20))
            .with_cancellation(rx);

        let handle = tokio::spawn(async move { client.get("k").await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("client did not stop")
            .expect("client task panicked");
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn test_pre_cancelled_client_fails_fast() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let client = KvClient::new("127.0.0.1:1")
            .unwrap()
            .with_backoff(Duration::from_millis(20))
            .with_cancellation(rx);

        let result = client.put("k", "v").await;
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }
}
