//! CLI command implementations.
//!
//! - [`settle`] - Replay a scenario and settle its flow matrix
//! - [`coords`] - Pack and unpack flow coordinates
//! - [`config`] - Validate a hub configuration file

pub mod config;
pub mod coords;
pub mod settle;

pub use config::CheckConfigCommand;
pub use coords::CoordsCommand;
pub use settle::SettleCommand;
