//! Collateralized group issuance.
//!
//! Collateral moves from the sender to the group treasury, the treasury's
//! receipt hook runs, then the sum of the collateral is minted in the group's
//! own currency to the receiver. A direct mint requires the group to trust
//! each collateral asset; a routed mint (a settlement edge ending at a group)
//! requires the collateral to be a permitted flow from the sender to the
//! group.

use tracing::{debug, info};
use trustflow_core::{Amount, AssetId, AvatarId, Timestamp};

use crate::error::{
    AcceptanceContext, HubError, PermissionError, PolicyOperation, RegistrationError, Result,
    StructuralError, checked_total,
};
use crate::events::HubEvent;
use crate::hooks::{CollateralDelivery, MintRequest, TreasuryMetadata};
use crate::hub::Hub;

/// Arguments of one issuance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IssueRequest<'a> {
    /// Collateral payer.
    pub sender: AvatarId,
    /// Receiver of the group currency.
    pub receiver: AvatarId,
    /// Group minting.
    pub group: AvatarId,
    /// Collateral issuers.
    pub collateral: &'a [AvatarId],
    /// Collateral amounts.
    pub amounts: &'a [Amount],
    /// Caller data, forwarded to the policy and the treasury.
    pub data: &'a [u8],
    /// Direct mint by the sender rather than a routed settlement edge.
    pub direct: bool,
}

/// Issue group currency against collateral. Returns the amount minted.
///
/// Must run inside a unit of work; partial effects are not undone here.
pub(crate) fn issue(hub: &Hub, request: &IssueRequest<'_>, now: Timestamp) -> Result<Amount> {
    let IssueRequest {
        sender,
        receiver,
        group,
        collateral,
        amounts,
        data,
        direct,
    } = *request;

    if collateral.len() != amounts.len() {
        return Err(StructuralError::ArrayLengthMismatch {
            collateral: collateral.len(),
            amounts: amounts.len(),
        }
        .into());
    }
    if collateral.is_empty() {
        return Err(StructuralError::EmptyCollateral.into());
    }

    let info = {
        let state = hub.state.read();
        let info = state
            .registry
            .group(group)
            .cloned()
            .ok_or(RegistrationError::NotAGroup(group))?;
        if let Some(index) = amounts.iter().position(|amount| amount.is_zero()) {
            return Err(StructuralError::ZeroAmount { index }.into());
        }
        for &asset in collateral {
            if direct {
                if !state.trust.is_trusted(group, asset, now) {
                    return Err(PermissionError::UntrustedCollateral {
                        group,
                        collateral: asset,
                    }
                    .into());
                }
            } else if !state.is_permitted_flow(sender, group, asset, now) {
                return Err(PermissionError::UnpermittedCollateral {
                    sender,
                    group,
                    collateral: asset,
                }
                .into());
            }
        }
        info
    };
    let total = checked_total(amounts)?;

    let policy = hub.hooks.read().mint_policy(info.mint_policy);
    let mint = MintRequest {
        sender,
        group,
        collateral,
        amounts,
        data,
    };
    let allowed = policy.is_some_and(|policy| policy.before_mint(hub, &mint));
    if !allowed {
        return Err(HubError::PolicyRejection {
            group,
            policy: info.mint_policy,
            operation: PolicyOperation::Mint,
            reason: "before_mint refused".to_string(),
        });
    }

    let assets: Vec<AssetId> = collateral.iter().copied().map(AssetId::of).collect();
    let metadata = TreasuryMetadata::group_mint(group, data).encode();
    hub.ledger
        .lock()
        .batch_transfer(sender, info.treasury, &assets, amounts, &metadata)?;
    debug!(
        sender = %sender,
        treasury = %info.treasury,
        assets = assets.len(),
        "collateral delivered"
    );

    let treasury = hub.hooks.read().treasury(info.treasury);
    if let Some(treasury) = treasury {
        let delivery = CollateralDelivery {
            from: sender,
            treasury: info.treasury,
            assets: &assets,
            amounts,
            metadata: &metadata,
        };
        treasury
            .on_collateral_received(hub, &delivery)
            .map_err(|rejection| HubError::AcceptanceRejection {
                from: sender,
                to: info.treasury,
                context: AcceptanceContext::CollateralReceipt { group },
                reason: rejection.into_reason(),
            })?;
    }

    hub.ledger
        .lock()
        .mint(receiver, AssetId::of(group), total, data)?;
    hub.state.write().record(HubEvent::GroupMint {
        sender,
        receiver,
        group,
        collateral: collateral.to_vec(),
        amounts: amounts.to_vec(),
        total,
    });
    info!(
        group = %group,
        sender = %sender,
        receiver = %receiver,
        total = %total,
        direct,
        "group currency minted"
    );
    Ok(total)
}
