//! Long-lived hub state.
//!
//! Everything except balances: the ledger owns those. The hub snapshots this
//! struct at the start of every unit of work and restores it on failure.

use std::collections::HashSet;

use trustflow_core::{AvatarId, Timestamp};

use crate::events::HubEvent;
use crate::registry::Registry;
use crate::trust::TrustGraph;

/// Registry, trust graph, operator approvals and the event journal.
#[derive(Debug, Clone, Default)]
pub struct HubState {
    /// Registered avatars.
    pub registry: Registry,
    /// Trust edges and consented-flow opt-ins.
    pub trust: TrustGraph,
    approvals: HashSet<(AvatarId, AvatarId)>,
    events: Vec<HubEvent>,
}

impl HubState {
    /// Whether `operator` may move `owner`'s funds.
    #[must_use]
    pub fn is_approved(&self, owner: AvatarId, operator: AvatarId) -> bool {
        owner == operator || self.approvals.contains(&(owner, operator))
    }

    /// Grant or revoke an operator approval.
    pub fn set_approval(&mut self, owner: AvatarId, operator: AvatarId, approved: bool) {
        if approved {
            self.approvals.insert((owner, operator));
        } else {
            self.approvals.remove(&(owner, operator));
        }
    }

    /// Whether `asset` may move from `from` to `to` at `now`.
    #[must_use]
    pub fn is_permitted_flow(
        &self,
        from: AvatarId,
        to: AvatarId,
        asset: AvatarId,
        now: Timestamp,
    ) -> bool {
        self.trust.is_permitted_flow(from, to, asset, now)
    }

    /// Append an event to the journal.
    pub fn record(&mut self, event: HubEvent) {
        self.events.push(event);
    }

    /// The event journal.
    #[must_use]
    pub fn events(&self) -> &[HubEvent] {
        &self.events
    }
}
