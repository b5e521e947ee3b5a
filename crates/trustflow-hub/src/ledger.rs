//! Balance ledger interface.
//!
//! The ledger is authoritative for all quantities; the hub never stores
//! balances itself. Implementations that apply time decay do so internally.
//!
//! Besides the balance operations the ledger takes part in the hub's unit of
//! work through [`Ledger::checkpoint`], [`Ledger::commit`] and
//! [`Ledger::rollback`]. Checkpoints nest and must be resolved in LIFO order.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;
use trustflow_core::{Amount, AssetId, AvatarId};

/// Errors returned by a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The holder does not have enough of the asset.
    #[error("insufficient balance: {holder} holds {available} of {asset}, needs {required}")]
    InsufficientBalance {
        /// Balance holder.
        holder: AvatarId,
        /// Asset being moved.
        asset: AssetId,
        /// Current balance.
        available: Amount,
        /// Amount required.
        required: Amount,
    },

    /// A balance or supply would overflow.
    #[error("balance overflow: {holder} in {asset}")]
    Overflow {
        /// Balance holder.
        holder: AvatarId,
        /// Asset being credited.
        asset: AssetId,
    },

    /// Batch arrays differ in length.
    #[error("batch has {assets} assets but {amounts} amounts")]
    BatchLengthMismatch {
        /// Asset entries.
        assets: usize,
        /// Amount entries.
        amounts: usize,
    },

    /// A checkpoint was resolved out of order or twice.
    #[error("unknown checkpoint {0}")]
    UnknownCheckpoint(usize),
}

impl LedgerError {
    /// Sub-code used by [`crate::HubError::code`].
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::Overflow { .. } => "balance_overflow",
            Self::BatchLengthMismatch { .. } => "batch_length_mismatch",
            Self::UnknownCheckpoint(_) => "unknown_checkpoint",
        }
    }
}

/// Handle of an open ledger checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// Depth of the checkpoint in the checkpoint stack.
    #[must_use]
    pub const fn depth(self) -> usize {
        self.0
    }
}

/// The external balance ledger consumed by the hub.
pub trait Ledger: Send {
    /// Balance of `asset` held by `holder`.
    fn balance_of(&self, holder: AvatarId, asset: AssetId) -> Amount;

    /// Create `amount` of `asset` for `to`.
    fn mint(&mut self, to: AvatarId, asset: AssetId, amount: Amount, data: &[u8])
        -> Result<(), LedgerError>;

    /// Destroy `amount` of `asset` held by `from`.
    fn burn(&mut self, from: AvatarId, asset: AssetId, amount: Amount) -> Result<(), LedgerError>;

    /// Move `amount` of `asset` from `from` to `to`.
    fn transfer(
        &mut self,
        from: AvatarId,
        to: AvatarId,
        asset: AssetId,
        amount: Amount,
        data: &[u8],
    ) -> Result<(), LedgerError>;

    /// Move several assets from `from` to `to`.
    fn batch_transfer(
        &mut self,
        from: AvatarId,
        to: AvatarId,
        assets: &[AssetId],
        amounts: &[Amount],
        data: &[u8],
    ) -> Result<(), LedgerError> {
        if assets.len() != amounts.len() {
            return Err(LedgerError::BatchLengthMismatch {
                assets: assets.len(),
                amounts: amounts.len(),
            });
        }
        for (asset, amount) in assets.iter().zip(amounts) {
            self.transfer(from, to, *asset, *amount, data)?;
        }
        Ok(())
    }

    /// Open a checkpoint that can later be committed or rolled back.
    fn checkpoint(&mut self) -> Checkpoint;

    /// Keep every mutation since `checkpoint`.
    fn commit(&mut self, checkpoint: Checkpoint) -> Result<(), LedgerError>;

    /// Discard every mutation since `checkpoint`.
    fn rollback(&mut self, checkpoint: Checkpoint) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, Default)]
struct Books {
    balances: HashMap<(AvatarId, AssetId), Amount>,
    supply: HashMap<AssetId, Amount>,
}

/// A non-decaying in-memory ledger.
///
/// Checkpoints snapshot the books; this is meant for tests, simulations and
/// the CLI scenario runner, not for large state.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    books: Books,
    snapshots: Vec<Books>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance outside of any hub operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the balance or supply would overflow.
    pub fn credit(
        &mut self,
        holder: AvatarId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.mint(holder, asset, amount, &[])
    }

    /// Total outstanding supply of `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: AssetId) -> Amount {
        self.books.supply.get(&asset).copied().unwrap_or_default()
    }

    /// Number of open checkpoints.
    #[must_use]
    pub fn open_checkpoints(&self) -> usize {
        self.snapshots.len()
    }

    fn debit(&mut self, holder: AvatarId, asset: AssetId, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(holder, asset);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                holder,
                asset,
                available,
                required: amount,
            })?;
        if remaining.is_zero() {
            self.books.balances.remove(&(holder, asset));
        } else {
            self.books.balances.insert((holder, asset), remaining);
        }
        Ok(())
    }

    fn add(&mut self, holder: AvatarId, asset: AssetId, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let updated = self
            .balance_of(holder, asset)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { holder, asset })?;
        self.books.balances.insert((holder, asset), updated);
        Ok(())
    }

    fn resolve(&mut self, checkpoint: Checkpoint) -> Result<Books, LedgerError> {
        if checkpoint.0 + 1 != self.snapshots.len() {
            return Err(LedgerError::UnknownCheckpoint(checkpoint.0));
        }
        self.snapshots
            .pop()
            .ok_or(LedgerError::UnknownCheckpoint(checkpoint.0))
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, holder: AvatarId, asset: AssetId) -> Amount {
        self.books
            .balances
            .get(&(holder, asset))
            .copied()
            .unwrap_or_default()
    }

    fn mint(
        &mut self,
        to: AvatarId,
        asset: AssetId,
        amount: Amount,
        _data: &[u8],
    ) -> Result<(), LedgerError> {
        let supply = self
            .total_supply(asset)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { holder: to, asset })?;
        self.add(to, asset, amount)?;
        self.books.supply.insert(asset, supply);
        debug!(to = %to, asset = %asset, amount = %amount, "ledger mint");
        Ok(())
    }

    fn burn(&mut self, from: AvatarId, asset: AssetId, amount: Amount) -> Result<(), LedgerError> {
        self.debit(from, asset, amount)?;
        let supply = self.total_supply(asset).checked_sub(amount).unwrap_or_default();
        self.books.supply.insert(asset, supply);
        debug!(from = %from, asset = %asset, amount = %amount, "ledger burn");
        Ok(())
    }

    fn transfer(
        &mut self,
        from: AvatarId,
        to: AvatarId,
        asset: AssetId,
        amount: Amount,
        _data: &[u8],
    ) -> Result<(), LedgerError> {
        self.debit(from, asset, amount)?;
        self.add(to, asset, amount)?;
        debug!(from = %from, to = %to, asset = %asset, amount = %amount, "ledger transfer");
        Ok(())
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.snapshots.push(self.books.clone());
        Checkpoint(self.snapshots.len() - 1)
    }

    fn commit(&mut self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        self.resolve(checkpoint).map(|_| ())
    }

    fn rollback(&mut self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        self.books = self.resolve(checkpoint)?;
        Ok(())
    }
}
