//! External collaborators invoked synchronously by the hub.
//!
//! Hooks are addressed by [`AvatarId`] and registered in a [`HookDirectory`].
//! Every hook receives the [`Hub`] it is called from and may re-enter it;
//! re-entrant calls join the unit of work that invoked the hook.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use trustflow_core::{Amount, AssetId, AvatarId, avatar::AVATAR_ID_LEN};

use crate::hub::Hub;

/// A reason given by a hook for refusing a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection(String);

impl Rejection {
    /// Create a rejection with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// The reason given by the hook.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.0
    }

    /// Consume into the reason string.
    #[must_use]
    pub fn into_reason(self) -> String {
        self.0
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arguments of a collateralized mint, as seen by a mint policy.
#[derive(Debug, Clone, Copy)]
pub struct MintRequest<'a> {
    /// Avatar paying the collateral.
    pub sender: AvatarId,
    /// Group whose currency is minted.
    pub group: AvatarId,
    /// Issuers of the collateral assets.
    pub collateral: &'a [AvatarId],
    /// Collateral amounts, aligned with `collateral`.
    pub amounts: &'a [Amount],
    /// Caller-supplied data.
    pub data: &'a [u8],
}

/// Arguments of a group currency burn, as seen by a mint policy.
#[derive(Debug, Clone, Copy)]
pub struct BurnRequest<'a> {
    /// Avatar burning the currency.
    pub burner: AvatarId,
    /// Group whose currency is burned.
    pub group: AvatarId,
    /// Amount burned.
    pub amount: Amount,
    /// Caller-supplied data.
    pub data: &'a [u8],
}

/// Decides whether a group may mint or burn.
pub trait MintPolicy: Send + Sync {
    /// Called before collateral moves; `false` aborts the mint.
    fn before_mint(&self, hub: &Hub, request: &MintRequest<'_>) -> bool;

    /// Called before group currency is burned; `false` aborts the burn.
    fn before_burn(&self, hub: &Hub, request: &BurnRequest<'_>) -> bool {
        let _ = (hub, request);
        true
    }
}

/// Collateral delivered to a group treasury.
#[derive(Debug, Clone, Copy)]
pub struct CollateralDelivery<'a> {
    /// Avatar the collateral came from.
    pub from: AvatarId,
    /// Treasury receiving the collateral.
    pub treasury: AvatarId,
    /// Collateral assets.
    pub assets: &'a [AssetId],
    /// Collateral amounts, aligned with `assets`.
    pub amounts: &'a [Amount],
    /// Encoded [`TreasuryMetadata`] identifying the group.
    pub metadata: &'a [u8],
}

/// Receives collateral backing a group currency.
pub trait Treasury: Send + Sync {
    /// Called after the collateral has been moved to the treasury.
    ///
    /// # Errors
    ///
    /// Returning a rejection aborts the mint.
    fn on_collateral_received(
        &self,
        hub: &Hub,
        delivery: &CollateralDelivery<'_>,
    ) -> Result<(), Rejection>;
}

/// The aggregated terminal legs of one stream.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    /// Stream source.
    pub from: AvatarId,
    /// Common receiver of the stream.
    pub to: AvatarId,
    /// Delivered assets, one per terminal edge.
    pub assets: &'a [AssetId],
    /// Delivered amounts, aligned with `assets`.
    pub amounts: &'a [Amount],
    /// Opaque stream data.
    pub data: &'a [u8],
}

/// Receiver-side check on a settled stream.
pub trait AcceptanceHook: Send + Sync {
    /// Called once per stream after every ledger mutation of the settlement.
    ///
    /// # Errors
    ///
    /// Returning a rejection aborts the settlement.
    fn on_receive(&self, hub: &Hub, delivery: &Delivery<'_>) -> Result<(), Rejection>;
}

/// Type tag of [`TreasuryMetadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MetadataKind {
    /// Collateral for a group mint.
    GroupMint = 1,
}

/// Metadata attached to collateral transfers into a treasury.
///
/// Encoded as one type byte, the 20-byte group id, then the user data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryMetadata {
    /// Metadata type.
    pub kind: MetadataKind,
    /// Group the collateral backs.
    pub group: AvatarId,
    /// User data passed to the mint.
    pub data: Vec<u8>,
}

impl TreasuryMetadata {
    /// Metadata for collateral backing a mint of `group`.
    #[must_use]
    pub fn group_mint(group: AvatarId, data: &[u8]) -> Self {
        Self {
            kind: MetadataKind::GroupMint,
            group,
            data: data.to_vec(),
        }
    }

    /// Encode to bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + AVATAR_ID_LEN + self.data.len());
        out.push(self.kind as u8);
        out.extend_from_slice(self.group.as_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode from bytes, `None` if malformed.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&kind, rest) = bytes.split_first()?;
        if kind != MetadataKind::GroupMint as u8 || rest.len() < AVATAR_ID_LEN {
            return None;
        }
        let (group, data) = rest.split_at(AVATAR_ID_LEN);
        let group: [u8; AVATAR_ID_LEN] = group.try_into().ok()?;
        Some(Self {
            kind: MetadataKind::GroupMint,
            group: AvatarId::from_bytes(group),
            data: data.to_vec(),
        })
    }
}

/// A policy that always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct StaticPolicy {
    allow_mint: bool,
    allow_burn: bool,
}

impl StaticPolicy {
    /// Allow every mint and burn.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self {
            allow_mint: true,
            allow_burn: true,
        }
    }

    /// Refuse every mint and burn.
    #[must_use]
    pub const fn deny_all() -> Self {
        Self {
            allow_mint: false,
            allow_burn: false,
        }
    }

    /// Allow mints, refuse burns.
    #[must_use]
    pub const fn mint_only() -> Self {
        Self {
            allow_mint: true,
            allow_burn: false,
        }
    }
}

impl MintPolicy for StaticPolicy {
    fn before_mint(&self, _hub: &Hub, _request: &MintRequest<'_>) -> bool {
        self.allow_mint
    }

    fn before_burn(&self, _hub: &Hub, _request: &BurnRequest<'_>) -> bool {
        self.allow_burn
    }
}

/// Accepts every delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AcceptanceHook for AcceptAll {
    fn on_receive(&self, _hub: &Hub, _delivery: &Delivery<'_>) -> Result<(), Rejection> {
        Ok(())
    }
}

impl Treasury for AcceptAll {
    fn on_collateral_received(
        &self,
        _hub: &Hub,
        _delivery: &CollateralDelivery<'_>,
    ) -> Result<(), Rejection> {
        Ok(())
    }
}

/// Rejects every delivery with a fixed reason.
#[derive(Debug, Clone)]
pub struct RejectAll {
    reason: String,
}

impl RejectAll {
    /// Create a hook rejecting with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl AcceptanceHook for RejectAll {
    fn on_receive(&self, _hub: &Hub, _delivery: &Delivery<'_>) -> Result<(), Rejection> {
        Err(Rejection::new(self.reason.clone()))
    }
}

impl Treasury for RejectAll {
    fn on_collateral_received(
        &self,
        _hub: &Hub,
        _delivery: &CollateralDelivery<'_>,
    ) -> Result<(), Rejection> {
        Err(Rejection::new(self.reason.clone()))
    }
}

/// Hook implementations by address.
///
/// A group whose policy address has no deployed policy refuses every mint.
/// Treasuries and receivers without a deployed hook accept.
#[derive(Clone, Default)]
pub struct HookDirectory {
    policies: HashMap<AvatarId, Arc<dyn MintPolicy>>,
    treasuries: HashMap<AvatarId, Arc<dyn Treasury>>,
    acceptance: HashMap<AvatarId, Arc<dyn AcceptanceHook>>,
}

impl fmt::Debug for HookDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDirectory")
            .field("policies", &self.policies.len())
            .field("treasuries", &self.treasuries.len())
            .field("acceptance", &self.acceptance.len())
            .finish()
    }
}

impl HookDirectory {
    /// Deploy a mint policy at `address`, replacing any previous one.
    pub fn deploy_mint_policy(&mut self, address: AvatarId, policy: Arc<dyn MintPolicy>) {
        self.policies.insert(address, policy);
    }

    /// Deploy a treasury at `address`, replacing any previous one.
    pub fn deploy_treasury(&mut self, address: AvatarId, treasury: Arc<dyn Treasury>) {
        self.treasuries.insert(address, treasury);
    }

    /// Install the acceptance hook of `avatar`.
    pub fn set_acceptance_hook(&mut self, avatar: AvatarId, hook: Arc<dyn AcceptanceHook>) {
        self.acceptance.insert(avatar, hook);
    }

    /// Remove the acceptance hook of `avatar`.
    pub fn clear_acceptance_hook(&mut self, avatar: AvatarId) {
        self.acceptance.remove(&avatar);
    }

    /// The policy deployed at `address`.
    #[must_use]
    pub fn mint_policy(&self, address: AvatarId) -> Option<Arc<dyn MintPolicy>> {
        self.policies.get(&address).cloned()
    }

    /// The treasury deployed at `address`.
    #[must_use]
    pub fn treasury(&self, address: AvatarId) -> Option<Arc<dyn Treasury>> {
        self.treasuries.get(&address).cloned()
    }

    /// The acceptance hook of `avatar`.
    #[must_use]
    pub fn acceptance_hook(&self, avatar: AvatarId) -> Option<Arc<dyn AcceptanceHook>> {
        self.acceptance.get(&avatar).cloned()
    }
}
