//! CLI argument definitions using clap
//!
//! Commands:
//! - vigilkv monitor --listen <addr>
//! - vigilkv replica --listen <addr> --monitor <addr>
//! - vigilkv view --monitor <addr>
//! - vigilkv get --monitor <addr> <key>
//! - vigilkv put --monitor <addr> <key> <value>

use crate::monitor::DEFAULT_MONITOR_ADDR;
use clap::{Parser, Subcommand};

/// VigilKV - a fault-tolerant primary/backup key-value store
#[derive(Parser, Debug)]
#[command(name = "vigilkv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the view monitor
    Monitor {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_MONITOR_ADDR)]
        listen: String,

        /// View re-evaluation cadence in milliseconds
        #[arg(long, default_value_t = 500)]
        tick_interval_ms: u64,

        /// Heartbeat deadline in milliseconds
        #[arg(long, default_value_t = 1500)]
        dead_interval_ms: u64,
    },

    /// Run a replica
    Replica {
        /// Address to listen on; doubles as the replica's identity
        #[arg(long, default_value = "127.0.0.1:4100")]
        listen: String,

        /// Address of the view monitor
        #[arg(long, default_value = DEFAULT_MONITOR_ADDR)]
        monitor: String,

        /// Heartbeat cadence in milliseconds
        #[arg(long, default_value_t = 500)]
        ping_interval_ms: u64,

        /// Outbound RPC timeout in milliseconds
        #[arg(long, default_value_t = 200)]
        rpc_timeout_ms: u64,
    },

    /// Print the current view
    View {
        /// Address of the view monitor
        #[arg(long, default_value = DEFAULT_MONITOR_ADDR)]
        monitor: String,
    },

    /// Read a key through the current primary
    Get {
        /// Address of the view monitor
        #[arg(long, default_value = DEFAULT_MONITOR_ADDR)]
        monitor: String,

        /// Key to read
        key: String,
    },

    /// Write a key through the current primary
    Put {
        /// Address of the view monitor
        #[arg(long, default_value = DEFAULT_MONITOR_ADDR)]
        monitor: String,

        /// Key to write
        key: String,

        /// Value to assign
        value: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
