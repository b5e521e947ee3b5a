//! Avatar identifiers.
//!
//! An avatar is any participant of the hub (human, group or organization).
//! Each avatar owns exactly one asset, so the avatar identifier doubles as the
//! asset identifier.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// Width of an avatar identifier in bytes.
pub const AVATAR_ID_LEN: usize = 20;

/// A fixed-width avatar identifier.
///
/// Ordering compares the bytes big-endian, which is the numeric order of the
/// identifier. Flow vertex lists rely on this order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AvatarId([u8; AVATAR_ID_LEN]);

impl AvatarId {
    /// The null identifier. Never registrable.
    pub const NULL: Self = Self([0u8; AVATAR_ID_LEN]);

    /// The reserved sentinel identifier (`0x…01`). Never registrable.
    pub const SENTINEL: Self = {
        let mut bytes = [0u8; AVATAR_ID_LEN];
        bytes[AVATAR_ID_LEN - 1] = 1;
        Self(bytes)
    };

    /// Create an identifier from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; AVATAR_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the identifier of an external account.
    ///
    /// The derivation is deterministic: the first 20 bytes of the BLAKE3
    /// digest of the account identifier.
    #[must_use]
    pub fn derive(account: impl AsRef<[u8]>) -> Self {
        let digest = blake3::hash(account.as_ref());
        let mut bytes = [0u8; AVATAR_ID_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..AVATAR_ID_LEN]);
        Self(bytes)
    }

    /// Build an identifier whose numeric value is `n`.
    ///
    /// Handy for tests and fixtures that need a known ordering.
    #[must_use]
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; AVATAR_ID_LEN];
        bytes[AVATAR_ID_LEN - 8..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Raw bytes of the identifier.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; AVATAR_ID_LEN] {
        &self.0
    }

    /// Whether this is the null identifier.
    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Whether this identifier is reserved (null or sentinel).
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        *self == Self::NULL || *self == Self::SENTINEL
    }

    /// Lower-case hex with `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short form used in logs (`0x1234…abcd`).
    #[must_use]
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AvatarId({})", self.short())
    }
}

impl FromStr for AvatarId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| CoreError::invalid_avatar_id(format!("invalid hex: {e}")))?;
        let bytes: [u8; AVATAR_ID_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::invalid_avatar_id(format!(
                "avatar id must be {AVATAR_ID_LEN} bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for AvatarId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AvatarId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The asset issued by one avatar.
///
/// Assets are identified by their issuing avatar; this newtype keeps the two
/// roles apart in signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(AvatarId);

impl AssetId {
    /// The asset issued by `avatar`.
    #[must_use]
    pub const fn of(avatar: AvatarId) -> Self {
        Self(avatar)
    }

    /// The avatar that issues this asset.
    #[must_use]
    pub const fn issuer(&self) -> AvatarId {
        self.0
    }
}

impl From<AvatarId> for AssetId {
    fn from(avatar: AvatarId) -> Self {
        Self(avatar)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
