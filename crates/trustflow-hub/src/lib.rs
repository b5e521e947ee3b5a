//! # trustflow-hub
//!
//! Trust-constrained multi-asset settlement.
//!
//! Avatars issue their own currencies and trust each other's. A payment
//! between avatars without mutual trust is settled as a flow matrix: a set of
//! edges that each move one asset along an active trust relation, plus the
//! streams declaring what the payer intended to deliver.
//!
//! ## Settlement pipeline
//!
//! 1. [`verifier`]: structural checks, registration, per-edge permission,
//!    and the matrix net-flow vector. Nothing is mutated.
//! 2. Execution: every edge becomes a ledger transfer, or a collateralized
//!    group mint when it ends at a group.
//! 3. Reconciliation: receivers accept their streams and the netted streams
//!    must equal the matrix vector.
//!
//! Any failure undoes the whole settlement.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trustflow_core::{Amount, AssetId, AvatarId, INDEFINITE};
//! use trustflow_hub::{FlowMatrixBuilder, Hub, ManualClock};
//!
//! let hub = Hub::builder()
//!     .clock(Arc::new(ManualClock::new(1_700_000_000)))
//!     .build()
//!     .unwrap();
//! let (alice, bob) = (AvatarId::derive("alice"), AvatarId::derive("bob"));
//! hub.register_human(alice, None, None).unwrap();
//! hub.register_human(bob, None, None).unwrap();
//! hub.trust(bob, alice, INDEFINITE).unwrap();
//! hub.with_ledger(|l| l.mint(alice, AssetId::of(alice), Amount::from_atto(10), &[]))
//!     .unwrap();
//!
//! let mut flow = FlowMatrixBuilder::new();
//! let stream = flow.stream(alice, Vec::new());
//! flow.terminal(stream, alice, alice, bob, Amount::from_atto(10));
//! let receipt = hub.settle_flow(alice, &flow.build().unwrap()).unwrap();
//!
//! assert_eq!(receipt.edges, 1);
//! assert_eq!(hub.balance_of(bob, AssetId::of(alice)), Amount::from_atto(10));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
mod executor;
pub mod flow;
pub mod hooks;
pub mod hub;
mod issuance;
pub mod ledger;
pub mod names;
mod reconciler;
pub mod registry;
pub mod state;
pub mod trust;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HubConfig, NameRules};
pub use error::{
    AcceptanceContext, ErrorKind, HubError, PermissionError, PolicyOperation, RegistrationError,
    Result, StreamError, StructuralError,
};
pub use events::HubEvent;
pub use flow::{
    FlowEdge, FlowMatrix, FlowMatrixBuilder, NetFlow, SettlementReceipt, Stream, VertexFlow,
};
pub use hooks::{
    AcceptAll, AcceptanceHook, BurnRequest, CollateralDelivery, Delivery, MintPolicy,
    MintRequest, RejectAll, Rejection, StaticPolicy, Treasury, TreasuryMetadata,
};
pub use hub::{Hub, HubBuilder};
pub use ledger::{InMemoryLedger, Ledger, LedgerError};
pub use names::{BasicNameValidator, NameValidator};
pub use registry::{AvatarKind, GroupInfo};
pub use trust::TrustEdge;
