//! Hub events.
//!
//! Every state change appends one event to the journal. The journal is part
//! of the hub state, so a failed unit of work leaves no events behind.

use serde::Serialize;
use trustflow_core::{Amount, AssetId, AvatarId, Timestamp};

/// A state change recorded by the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    /// A human registered.
    RegisterHuman {
        /// New human.
        avatar: AvatarId,
        /// Inviting human, if any.
        inviter: Option<AvatarId>,
    },
    /// A group registered.
    RegisterGroup {
        /// New group.
        group: AvatarId,
        /// Mint policy address.
        mint_policy: AvatarId,
        /// Treasury address.
        treasury: AvatarId,
        /// Group name.
        name: String,
        /// Group symbol.
        symbol: String,
    },
    /// An organization registered.
    RegisterOrganization {
        /// New organization.
        organization: AvatarId,
        /// Optional name.
        name: Option<String>,
    },
    /// A trust edge was inserted or updated.
    Trust {
        /// Trusting avatar.
        truster: AvatarId,
        /// Trusted avatar.
        trustee: AvatarId,
        /// Effective expiry.
        expiry: Timestamp,
    },
    /// An avatar changed its consented-flow setting.
    ConsentedFlow {
        /// Avatar.
        avatar: AvatarId,
        /// New setting.
        enabled: bool,
    },
    /// An owner changed an operator approval.
    ApprovalForAll {
        /// Owner of the funds.
        owner: AvatarId,
        /// Operator.
        operator: AvatarId,
        /// New approval.
        approved: bool,
    },
    /// Group currency was minted against collateral.
    GroupMint {
        /// Collateral payer.
        sender: AvatarId,
        /// Receiver of the group currency.
        receiver: AvatarId,
        /// Group.
        group: AvatarId,
        /// Collateral issuers.
        collateral: Vec<AvatarId>,
        /// Collateral amounts.
        amounts: Vec<Amount>,
        /// Group currency minted.
        total: Amount,
    },
    /// Currency was burned.
    Burn {
        /// Burning avatar.
        burner: AvatarId,
        /// Asset burned.
        asset: AssetId,
        /// Amount burned.
        amount: Amount,
    },
    /// A settlement stream passed reconciliation.
    StreamCompleted {
        /// Settling operator.
        operator: AvatarId,
        /// Stream source.
        from: AvatarId,
        /// Stream receiver.
        to: AvatarId,
        /// Delivered assets.
        assets: Vec<AssetId>,
        /// Delivered amounts.
        amounts: Vec<Amount>,
    },
}

impl HubEvent {
    /// Snake-case event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegisterHuman { .. } => "register_human",
            Self::RegisterGroup { .. } => "register_group",
            Self::RegisterOrganization { .. } => "register_organization",
            Self::Trust { .. } => "trust",
            Self::ConsentedFlow { .. } => "consented_flow",
            Self::ApprovalForAll { .. } => "approval_for_all",
            Self::GroupMint { .. } => "group_mint",
            Self::Burn { .. } => "burn",
            Self::StreamCompleted { .. } => "stream_completed",
        }
    }
}
