//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use hsk_link::constants::DEFAULT_LISTEN_MS;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

// =============================================================================
// CLI Definition
// =============================================================================

/// Packet link to housekeeping boards over serial
#[derive(Parser, Debug, Default)]
#[command(name = "hsk-link")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./hsk-link.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Serial port to use (overrides config and auto-detection)
    #[arg(long, value_name = "PORT", global = true)]
    pub port: Option<String>,

    /// Baud rate (overrides config)
    #[arg(long, value_name = "RATE", global = true)]
    pub baud: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands; monitoring is the default
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Ping every board, then log all traffic until Ctrl-C
    Monitor,

    /// Send one packet, then log replies
    Send {
        /// Destination address
        #[arg(long)]
        dst: u8,

        /// Command code
        #[arg(long)]
        cmd: u8,

        /// Payload bytes, comma separated
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        payload: Vec<u8>,

        /// Send this checksum instead of the computed one
        #[arg(long, value_name = "BYTE")]
        checksum: Option<u8>,

        /// How long to listen for replies
        #[arg(long, value_name = "MS", default_value_t = DEFAULT_LISTEN_MS)]
        listen_ms: u64,
    },

    /// List serial ports
    Ports,

    /// Write a config file with default values
    InitConfig {
        /// Destination (default: ./hsk-link.toml)
        path: Option<PathBuf>,
    },
}

// =============================================================================
// Tests
// =============================================================================
