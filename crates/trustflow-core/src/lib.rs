//! # trustflow-core
//!
//! Primitives shared by the trustflow settlement hub.
//!
//! This crate provides:
//!
//! - [`AvatarId`] / [`AssetId`]: fixed-width participant and asset identifiers
//! - [`Amount`]: checked fixed-point asset quantities
//! - [`coords`]: the packed flow-coordinate wire codec

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod avatar;
pub mod coords;
pub mod error;

pub use amount::Amount;
pub use avatar::{AssetId, AvatarId};
pub use coords::{Coordinate, CoordinateTriple};
pub use error::CoreError;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Expiry of a trust edge that never lapses.
pub const INDEFINITE: Timestamp = Timestamp::MAX;
