use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storeledger_catalog::{ProductId, StoreId};
use storeledger_inventory::{StockEntry, StockMovement, TransferOutcome, TransferStock};

use super::{Repositories, ServiceResult};
use crate::ledger::{MovementFilter, StockLedger};

/// Stock dashboard queries and store-to-store transfers.
#[derive(Clone)]
pub struct StockService {
    repos: Repositories,
    ledger: Arc<dyn StockLedger>,
}

impl StockService {
    pub fn new(repos: Repositories, ledger: Arc<dyn StockLedger>) -> Self {
        Self { repos, ledger }
    }

    /// Move stock between stores. An unmet precondition is reported as
    /// `TransferOutcome::Rejected`, not as an error.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        product_id: ProductId,
        from_store: StoreId,
        to_store: StoreId,
        amount: u64,
    ) -> ServiceResult<TransferOutcome> {
        self.repos.product(product_id)?;
        self.repos.store(from_store)?;
        self.repos.store(to_store)?;

        let outcome = self
            .ledger
            .transfer(TransferStock {
                product_id,
                from_store,
                to_store,
                amount,
                occurred_at: Utc::now(),
            })
            .await?;
        Ok(outcome)
    }

    pub async fn entries(&self) -> ServiceResult<Vec<StockEntry>> {
        Ok(self.ledger.entries().await?)
    }

    pub async fn entries_for_store(&self, store_id: StoreId) -> ServiceResult<Vec<StockEntry>> {
        self.repos.store(store_id)?;
        Ok(self.ledger.entries_for_store(store_id).await?)
    }

    pub async fn movements(&self, filter: &MovementFilter) -> ServiceResult<Vec<StockMovement>> {
        Ok(self.ledger.movements(filter).await?)
    }
}
