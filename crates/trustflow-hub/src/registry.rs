//! Avatar registry.
//!
//! Registration is monotone: avatars are never removed and re-registration
//! fails. Records live in an insertion-ordered arena with a hash index.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use trustflow_core::{AvatarId, Timestamp};

use crate::error::{RegistrationError, Result};

/// Classification of an avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarKind {
    /// A person issuing a personal currency.
    Human,
    /// A collective issuing collateral-backed currency.
    Group,
    /// A registered avatar without a currency.
    Organization,
    /// Not registered.
    Unregistered,
}

impl fmt::Display for AvatarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Human => "human",
            Self::Group => "group",
            Self::Organization => "organization",
            Self::Unregistered => "unregistered",
        };
        f.write_str(s)
    }
}

/// Registration data of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    /// Address of the mint policy.
    pub mint_policy: AvatarId,
    /// Address of the treasury holding collateral.
    pub treasury: AvatarId,
    /// Display name.
    pub name: String,
    /// Currency symbol.
    pub symbol: String,
    /// Opaque metadata reference.
    pub metadata: Option<String>,
}

/// What the registry knows about one avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AvatarRecord {
    /// A registered human.
    Human {
        /// Issuance-eligibility marker, never zero.
        last_issuance: Timestamp,
        /// Inviting human, if any.
        inviter: Option<AvatarId>,
        /// Opaque metadata reference.
        metadata: Option<String>,
    },
    /// A registered group.
    Group(GroupInfo),
    /// A registered organization.
    Organization {
        /// Optional display name.
        name: Option<String>,
        /// Opaque metadata reference.
        metadata: Option<String>,
    },
}

impl AvatarRecord {
    /// A human record registered at `now`.
    #[must_use]
    pub fn human(now: Timestamp, inviter: Option<AvatarId>, metadata: Option<String>) -> Self {
        Self::Human {
            last_issuance: now.max(1),
            inviter,
            metadata,
        }
    }

    /// The classification of this record.
    #[must_use]
    pub const fn kind(&self) -> AvatarKind {
        match self {
            Self::Human { .. } => AvatarKind::Human,
            Self::Group(_) => AvatarKind::Group,
            Self::Organization { .. } => AvatarKind::Organization,
        }
    }
}

/// Registered avatars in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    order: Vec<AvatarId>,
    records: HashMap<AvatarId, AvatarRecord>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `avatar`.
    ///
    /// # Errors
    ///
    /// Fails for reserved ids and for avatars that are already registered.
    pub fn insert(&mut self, avatar: AvatarId, record: AvatarRecord) -> Result<()> {
        if avatar.is_reserved() {
            return Err(RegistrationError::ReservedId(avatar).into());
        }
        if self.records.contains_key(&avatar) {
            return Err(RegistrationError::AlreadyRegistered(avatar).into());
        }
        self.order.push(avatar);
        self.records.insert(avatar, record);
        Ok(())
    }

    /// The record of `avatar`.
    #[must_use]
    pub fn get(&self, avatar: AvatarId) -> Option<&AvatarRecord> {
        self.records.get(&avatar)
    }

    /// Classify `avatar`.
    #[must_use]
    pub fn classify(&self, avatar: AvatarId) -> AvatarKind {
        self.get(avatar)
            .map_or(AvatarKind::Unregistered, AvatarRecord::kind)
    }

    /// Whether `avatar` is registered.
    #[must_use]
    pub fn is_registered(&self, avatar: AvatarId) -> bool {
        self.records.contains_key(&avatar)
    }

    /// Group data of `avatar`, if it is a group.
    #[must_use]
    pub fn group(&self, avatar: AvatarId) -> Option<&GroupInfo> {
        match self.get(avatar) {
            Some(AvatarRecord::Group(info)) => Some(info),
            _ => None,
        }
    }

    /// Require `avatar` to be registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::NotRegistered`] otherwise.
    pub fn require(&self, avatar: AvatarId) -> Result<&AvatarRecord> {
        self.get(avatar)
            .ok_or_else(|| RegistrationError::NotRegistered(avatar).into())
    }

    /// Registered avatars in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (AvatarId, &AvatarRecord)> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).map(|record| (*id, record)))
    }

    /// Number of registered avatars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no avatar is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
