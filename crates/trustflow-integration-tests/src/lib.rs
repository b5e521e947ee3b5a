//! Integration test crate for the trustflow hub.
//!
//! The test modules under `tests/` drive a [`Hub`] end to end through its
//! public API. This library only holds the fixtures they share.

#![forbid(unsafe_code)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use parking_lot::Mutex;
use trustflow_core::amount::ATTO_PER_TOKEN;
use trustflow_core::{Amount, AssetId, AvatarId, CoordinateTriple, INDEFINITE, Timestamp, coords};
use trustflow_hub::{
    AcceptanceHook, Delivery, FlowEdge, FlowMatrix, Hub, HubConfig, ManualClock, Rejection,
    StaticPolicy, Stream,
};

/// Clock reading every fixture starts at.
pub const NOW: Timestamp = 1_700_000_000;

/// Address of the permissive mint policy deployed by [`Fixture::new`].
pub const POLICY: u64 = 900;

/// Address of the treasury used by [`Fixture::group`].
pub const TREASURY: u64 = 901;

/// Avatar with a known position in vertex order.
///
/// Small values are reserved, so fixtures use multiples of ten.
#[must_use]
pub fn avatar(n: u64) -> AvatarId {
    AvatarId::from_low_u64(n)
}

/// `n` whole tokens.
#[must_use]
pub const fn tokens(n: u128) -> Amount {
    Amount::from_atto(n * ATTO_PER_TOKEN)
}

/// A hub at [`NOW`] with a controllable clock.
pub struct Fixture {
    /// Hub under test.
    pub hub: Hub,
    /// Clock driving the hub.
    pub clock: Arc<ManualClock>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Hub with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Hub with `config`.
    #[must_use]
    pub fn with_config(config: HubConfig) -> Self {
        let clock = Arc::new(ManualClock::new(NOW));
        let hub = Hub::builder()
            .config(config)
            .clock(clock.clone())
            .mint_policy(avatar(POLICY), Arc::new(StaticPolicy::allow_all()))
            .build()
            .unwrap();
        Self { hub, clock }
    }

    /// Register a human holding `balance` tokens of its own currency.
    pub fn human(&self, n: u64, balance: u128) -> AvatarId {
        let id = avatar(n);
        self.hub.register_human(id, None, None).unwrap();
        if balance > 0 {
            self.fund(id, id, balance);
        }
        id
    }

    /// Register a group minting through [`POLICY`] into [`TREASURY`].
    pub fn group(&self, n: u64) -> AvatarId {
        let id = avatar(n);
        self.hub
            .register_custom_group(id, avatar(POLICY), avatar(TREASURY), "Group", "GRP", None)
            .unwrap();
        id
    }

    /// Credit `amount` tokens of `issuer`'s currency to `holder`.
    pub fn fund(&self, holder: AvatarId, issuer: AvatarId, amount: u128) {
        self.hub
            .with_ledger(|ledger| ledger.mint(holder, AssetId::of(issuer), tokens(amount), &[]))
            .unwrap();
    }

    /// `truster` trusts `trustee` indefinitely.
    pub fn trust(&self, truster: AvatarId, trustee: AvatarId) {
        self.hub.trust(truster, trustee, INDEFINITE).unwrap();
    }

    /// Balance of `issuer`'s currency held by `holder`.
    #[must_use]
    pub fn balance(&self, holder: AvatarId, issuer: AvatarId) -> Amount {
        self.hub.balance_of(holder, AssetId::of(issuer))
    }
}

/// One edge of a [`raw_matrix`]: `(asset, sender, receiver, tokens, stream_tag)`.
pub type RawEdge = (u16, u16, u16, u128, u16);

/// Build a flow matrix exactly as given, without sorting or deduplication.
#[must_use]
pub fn raw_matrix(vertices: &[AvatarId], edges: &[RawEdge], streams: Vec<Stream>) -> FlowMatrix {
    let triples: Vec<CoordinateTriple> = edges
        .iter()
        .map(|&(asset, sender, receiver, _, _)| CoordinateTriple::new(asset, sender, receiver))
        .collect();
    FlowMatrix {
        vertices: vertices.to_vec(),
        edges: edges
            .iter()
            .map(|&(_, _, _, amount, stream_tag)| FlowEdge {
                stream_tag,
                amount: tokens(amount),
            })
            .collect(),
        streams,
        packed_coordinates: coords::pack(&triples),
    }
}

/// A stream from vertex `source` terminating at `edge_ids`.
#[must_use]
pub fn stream(source: u16, edge_ids: &[u16]) -> Stream {
    Stream {
        source,
        edge_ids: edge_ids.to_vec(),
        data: Vec::new(),
    }
}

/// What an acceptance hook saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenDelivery {
    /// Stream source.
    pub from: AvatarId,
    /// Receiver.
    pub to: AvatarId,
    /// Delivered assets.
    pub assets: Vec<AssetId>,
    /// Delivered amounts.
    pub amounts: Vec<Amount>,
    /// Stream data.
    pub data: Vec<u8>,
}

/// Acceptance hook recording every delivery it accepts.
#[derive(Debug, Default)]
pub struct RecordingHook {
    seen: Mutex<Vec<SeenDelivery>>,
}

impl RecordingHook {
    /// Deliveries seen so far.
    pub fn seen(&self) -> Vec<SeenDelivery> {
        self.seen.lock().clone()
    }
}

impl AcceptanceHook for RecordingHook {
    fn on_receive(&self, _hub: &Hub, delivery: &Delivery<'_>) -> Result<(), Rejection> {
        self.seen.lock().push(SeenDelivery {
            from: delivery.from,
            to: delivery.to,
            assets: delivery.assets.to_vec(),
            amounts: delivery.amounts.to_vec(),
            data: delivery.data.to_vec(),
        });
        Ok(())
    }
}
