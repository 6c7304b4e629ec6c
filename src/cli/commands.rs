//! CLI command dispatch
//!
//! Each command builds its component's configuration from flags, spins up
//! a runtime, and blocks until completion. Server commands run until
//! interrupted; client commands are one-shot.

use std::time::Duration;

use super::args::Command;
use super::errors::{CliError, CliResult};
use crate::client::KvClient;
use crate::monitor::{MonitorConfig, MonitorServer};
use crate::replica::{ReplicaConfig, ReplicaServer};
use crate::rpc::types::ViewPayload;
use crate::rpc::RpcClient;

/// Dispatch a parsed command.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Monitor {
            listen,
            tick_interval_ms,
            dead_interval_ms,
        } => run_monitor(listen, tick_interval_ms, dead_interval_ms),
        Command::Replica {
            listen,
            monitor,
            ping_interval_ms,
            rpc_timeout_ms,
        } => run_replica(listen, monitor, ping_interval_ms, rpc_timeout_ms),
        Command::View { monitor } => run_view(monitor),
        Command::Get { monitor, key } => run_get(monitor, key),
        Command::Put {
            monitor,
            key,
            value,
        } => run_put(monitor, key, value),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(CliError::Runtime)
}

fn run_monitor(listen: String, tick_interval_ms: u64, dead_interval_ms: u64) -> CliResult<()> {
    let config = MonitorConfig::new(listen).with_timing(
        Duration::from_millis(tick_interval_ms),
        Duration::from_millis(dead_interval_ms),
    );
    runtime()?.block_on(MonitorServer::run(config))?;
    Ok(())
}

fn run_replica(
    listen: String,
    monitor: String,
    ping_interval_ms: u64,
    rpc_timeout_ms: u64,
) -> CliResult<()> {
    let config = ReplicaConfig::new(listen, monitor).with_timing(
        Duration::from_millis(ping_interval_ms),
        Duration::from_millis(rpc_timeout_ms),
    );
    runtime()?.block_on(ReplicaServer::run(config))?;
    Ok(())
}

fn run_view(monitor: String) -> CliResult<()> {
    let view = runtime()?.block_on(async {
        let rpc = RpcClient::new()?;
        rpc.get_view(&monitor).await
    })?;

    let payload = ViewPayload::from(view);
    println!(
        "{}",
        serde_json::json!({
            "status": "ok",
            "view_number": payload.view_number,
            "primary": payload.primary,
            "backup": payload.backup,
        })
    );
    Ok(())
}

fn run_get(monitor: String, key: String) -> CliResult<()> {
    let value = runtime()?.block_on(async {
        let client = KvClient::new(monitor)?;
        client.get(&key).await
    })?;

    println!(
        "{}",
        serde_json::json!({
            "status": "ok",
            "key": key,
            // A missing key reads as empty.
            "value": value.unwrap_or_default(),
        })
    );
    Ok(())
}

fn run_put(monitor: String, key: String, value: String) -> CliResult<()> {
    runtime()?.block_on(async {
        let client = KvClient::new(monitor)?;
        client.put(&key, &value).await
    })?;

    println!(
        "{}",
        serde_json::json!({
            "status": "ok",
            "key": key,
        })
    );
    Ok(())
}
