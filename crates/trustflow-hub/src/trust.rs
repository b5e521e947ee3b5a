//! Directional trust graph and the flow-permission predicate.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use trustflow_core::{AvatarId, INDEFINITE, Timestamp};

use crate::error::PermissionError;

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustUpdate {
    /// The edge did not exist.
    Inserted,
    /// The edge existed; only its expiry changed.
    Updated {
        /// Expiry before the update.
        previous: Timestamp,
    },
}

/// One outgoing trust edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrustEdge {
    /// Trusted avatar.
    pub trustee: AvatarId,
    /// Expiry in unix seconds.
    pub expiry: Timestamp,
}

#[derive(Debug, Clone, Default)]
struct TrustList {
    order: Vec<AvatarId>,
    expiries: HashMap<AvatarId, Timestamp>,
}

/// Trust edges of every truster, plus consented-flow opt-ins.
#[derive(Debug, Clone, Default)]
pub struct TrustGraph {
    lists: HashMap<AvatarId, TrustList>,
    consented: HashSet<AvatarId>,
}

impl TrustGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update the edge `truster -> trustee`.
    ///
    /// Edges are never removed; revocation sets the expiry to the present.
    ///
    /// # Errors
    ///
    /// Self-trust is immutable and cannot be changed here.
    pub fn upsert(
        &mut self,
        truster: AvatarId,
        trustee: AvatarId,
        expiry: Timestamp,
    ) -> Result<TrustUpdate, PermissionError> {
        if truster == trustee {
            return Err(PermissionError::SelfTrust(truster));
        }
        Ok(self.set(truster, trustee, expiry))
    }

    /// Install the indefinite self-trust edge of a newly registered avatar.
    pub(crate) fn establish_self_trust(&mut self, avatar: AvatarId) {
        self.set(avatar, avatar, INDEFINITE);
    }

    fn set(&mut self, truster: AvatarId, trustee: AvatarId, expiry: Timestamp) -> TrustUpdate {
        let list = self.lists.entry(truster).or_default();
        match list.expiries.insert(trustee, expiry) {
            Some(previous) => TrustUpdate::Updated { previous },
            None => {
                list.order.push(trustee);
                TrustUpdate::Inserted
            }
        }
    }

    /// Expiry of `truster -> trustee`, if the edge was ever set.
    #[must_use]
    pub fn expiry(&self, truster: AvatarId, trustee: AvatarId) -> Option<Timestamp> {
        self.lists
            .get(&truster)
            .and_then(|list| list.expiries.get(&trustee))
            .copied()
    }

    /// Whether `truster` trusts `trustee` at `now`.
    #[must_use]
    pub fn is_trusted(&self, truster: AvatarId, trustee: AvatarId, now: Timestamp) -> bool {
        self.expiry(truster, trustee)
            .is_some_and(|expiry| expiry >= now)
    }

    /// Outgoing edges of `truster` in insertion order, including expired ones.
    #[must_use]
    pub fn trustees(&self, truster: AvatarId) -> Vec<TrustEdge> {
        self.lists
            .get(&truster)
            .map(|list| {
                list.order
                    .iter()
                    .filter_map(|trustee| {
                        list.expiries.get(trustee).map(|&expiry| TrustEdge {
                            trustee: *trustee,
                            expiry,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Opt `avatar` in or out of consented flow.
    pub fn set_consented(&mut self, avatar: AvatarId, enabled: bool) {
        if enabled {
            self.consented.insert(avatar);
        } else {
            self.consented.remove(&avatar);
        }
    }

    /// Whether `avatar` opted into consented flow.
    #[must_use]
    pub fn has_consented(&self, avatar: AvatarId) -> bool {
        self.consented.contains(&avatar)
    }

    /// Whether `asset` may move from `from` to `to` at `now`.
    ///
    /// The receiver must trust the asset. A sender that opted into consented
    /// flow additionally requires its own trust in the receiver and the
    /// receiver's opt-in.
    #[must_use]
    pub fn is_permitted_flow(
        &self,
        from: AvatarId,
        to: AvatarId,
        asset: AvatarId,
        now: Timestamp,
    ) -> bool {
        if !self.is_trusted(to, asset, now) {
            return false;
        }
        if !self.has_consented(from) {
            return true;
        }
        self.is_trusted(from, to, now) && self.has_consented(to)
    }
}
