//! Asset amount type with fixed-point precision.
//!
//! Every avatar's asset uses 18 decimal places. Amounts are stored in the
//! smallest unit (atto) and all arithmetic is checked.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// Number of decimal places of every asset.
pub const DECIMALS: u32 = 18;

/// One whole token in atto units.
pub const ATTO_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// An unsigned quantity of one asset, in atto units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    /// Zero amount constant.
    pub const ZERO: Self = Self(0);

    /// Largest amount that can take part in a netted flow.
    ///
    /// Net flows are accumulated as `i128`, so a single amount must fit there.
    pub const MAX_FLOW: Self = Self(i128::MAX as u128);

    /// Creates an amount from atto units.
    #[must_use]
    pub const fn from_atto(atto: u128) -> Self {
        Self(atto)
    }

    /// Creates an amount from whole tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the result does not fit in `u128`.
    pub fn from_whole(whole: u64) -> Result<Self, CoreError> {
        u128::from(whole)
            .checked_mul(ATTO_PER_TOKEN)
            .map(Self)
            .ok_or_else(|| CoreError::invalid_amount("overflow"))
    }

    /// Returns the amount in atto units.
    #[must_use]
    pub const fn as_atto(self) -> u128 {
        self.0
    }

    /// Returns the amount as a signed flow quantity, if it fits.
    #[must_use]
    pub fn as_flow(self) -> Option<i128> {
        i128::try_from(self.0).ok()
    }

    /// Checked addition. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction. Returns `None` on underflow.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Returns true if this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Sums a sequence of amounts, returning `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ATTO_PER_TOKEN;
        let frac = self.0 % ATTO_PER_TOKEN;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let frac_str = format!("{frac:018}");
            write!(f, "{whole}.{}", frac_str.trim_end_matches('0'))
        }
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('-') {
            return Err(CoreError::invalid_amount("negative values not allowed"));
        }

        let (whole_str, frac_str) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if frac_str.contains('.') {
            return Err(CoreError::invalid_amount(format!("invalid format: {s}")));
        }
        if frac_str.len() > DECIMALS as usize {
            return Err(CoreError::invalid_amount("too many decimal places"));
        }

        let whole: u128 = if whole_str.is_empty() {
            0
        } else {
            whole_str
                .parse()
                .map_err(|_| CoreError::invalid_amount(format!("invalid whole part: {s}")))?
        };

        let frac: u128 = if frac_str.is_empty() {
            0
        } else {
            format!("{frac_str:0<18}")
                .parse()
                .map_err(|_| CoreError::invalid_amount(format!("invalid fractional part: {s}")))?
        };

        whole
            .checked_mul(ATTO_PER_TOKEN)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(|| CoreError::invalid_amount("overflow"))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
