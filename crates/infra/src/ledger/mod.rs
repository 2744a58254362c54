//! Stock ledger: the single writer of per-(product, store) quantities.
//!
//! Every successful adjustment updates exactly one entry and appends exactly
//! one movement in the same unit of work. Backends:
//! - `InMemoryStockLedger` (one mutex over entries + movements)
//! - `PostgresStockLedger` (row locks inside a transaction)
//! - `PublishingStockLedger` (decorator: publish movements after commit)

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use storeledger_catalog::{ProductId, StoreId};
use storeledger_core::DomainError;
use storeledger_inventory::{
    AdjustStock, MovementDirection, StockEntry, StockKey, StockMovement, TransferOutcome,
    TransferStock,
};

pub mod in_memory;
pub mod postgres;
pub mod publishing;

pub use in_memory::InMemoryStockLedger;
pub use postgres::PostgresStockLedger;
pub use publishing::PublishingStockLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Deterministic rejection (validation, insufficient stock, ...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage backend failure; nothing was committed.
    #[error("ledger store error: {0}")]
    Store(String),
}

impl LedgerError {
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, LedgerError::Domain(e) if e.is_insufficient_stock())
    }
}

/// Query over the movement log. All fields are optional conjunctive filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub store_id: Option<StoreId>,
    pub direction: Option<MovementDirection>,
    pub since: Option<DateTime<Utc>>,
    /// Keep only the most recent `limit` matches.
    pub limit: Option<usize>,
}

impl MovementFilter {
    pub fn matches(&self, m: &StockMovement) -> bool {
        self.product_id.is_none_or(|p| p == m.product_id)
            && self.store_id.is_none_or(|s| s == m.store_id)
            && self.direction.is_none_or(|d| d == m.direction)
            && self.since.is_none_or(|t| m.occurred_at >= t)
    }
}

#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Apply one adjustment atomically.
    ///
    /// OUT fails with `DomainError::InsufficientStock` when the entry holds
    /// less than `amount` (a missing entry holds 0) and leaves it unchanged.
    /// IN creates the entry on first use.
    async fn adjust(&self, cmd: AdjustStock) -> Result<StockMovement, LedgerError>;

    /// Move stock between two stores as one unit of work.
    async fn transfer(&self, cmd: TransferStock) -> Result<TransferOutcome, LedgerError>;

    async fn entry(&self, key: StockKey) -> Result<Option<StockEntry>, LedgerError>;

    /// All entries ordered by (product, store).
    async fn entries(&self) -> Result<Vec<StockEntry>, LedgerError>;

    async fn entries_for_store(&self, store_id: StoreId) -> Result<Vec<StockEntry>, LedgerError>;

    /// Matching movements, oldest first.
    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, LedgerError>;

    /// Current quantity; 0 when no entry exists.
    async fn quantity(&self, key: StockKey) -> Result<u64, LedgerError> {
        Ok(self.entry(key).await?.map(|e| e.quantity()).unwrap_or(0))
    }
}

#[async_trait]
impl<L> StockLedger for Arc<L>
where
    L: StockLedger + ?Sized,
{
    async fn adjust(&self, cmd: AdjustStock) -> Result<StockMovement, LedgerError> {
        (**self).adjust(cmd).await
    }

    async fn transfer(&self, cmd: TransferStock) -> Result<TransferOutcome, LedgerError> {
        (**self).transfer(cmd).await
    }

    async fn entry(&self, key: StockKey) -> Result<Option<StockEntry>, LedgerError> {
        (**self).entry(key).await
    }

    async fn entries(&self) -> Result<Vec<StockEntry>, LedgerError> {
        (**self).entries().await
    }

    async fn entries_for_store(&self, store_id: StoreId) -> Result<Vec<StockEntry>, LedgerError> {
        (**self).entries_for_store(store_id).await
    }

    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, LedgerError> {
        (**self).movements(filter).await
    }
}

/// Keep the newest `limit` items of an oldest-first list.
pub(crate) fn keep_latest<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        if items.len() > limit {
            items.drain(..items.len() - limit);
        }
    }
    items
}
