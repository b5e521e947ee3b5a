//! # trustflow-cli
//!
//! Command-line interface for the trustflow settlement hub.
//!
//! Provides commands for:
//! - Replaying a scenario file and settling its flow matrix
//! - Packing and unpacking flow coordinates
//! - Validating hub configuration files
//!
//! Scenarios run against an in-memory ledger at a fixed clock reading, so
//! a settlement can be inspected without any deployed infrastructure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod scenario;

pub use cli::{Cli, Commands, Format, SettleArgs};
pub use error::CliError;
pub use output::OutputFormat;
pub use scenario::Scenario;
