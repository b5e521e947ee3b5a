//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// trustflow - trust-constrained multi-asset settlement.
#[derive(Parser, Debug, Clone)]
#[command(name = "trustflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Replay a scenario file and settle its flow matrix.
    Settle(SettleArgs),

    /// Pack coordinate triples into the wire format.
    EncodeCoords {
        /// Triples as `asset,sender,receiver`.
        #[arg(required = true)]
        triples: Vec<String>,
    },

    /// Unpack hex-encoded coordinates.
    DecodeCoords {
        /// Packed coordinates, hex with optional `0x` prefix.
        hex: String,
    },

    /// Load and validate a hub configuration file.
    CheckConfig {
        /// Path to the TOML file.
        path: PathBuf,
    },
}

/// Arguments for the settle command.
#[derive(Parser, Debug, Clone)]
pub struct SettleArgs {
    /// Scenario file (JSON).
    #[arg(short, long, env = "TRUSTFLOW_SCENARIO")]
    pub scenario: PathBuf,

    /// Include the event journal of the settlement in the output.
    #[arg(long)]
    pub events: bool,
}
