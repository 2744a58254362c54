use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use storeledger_catalog::{CustomerId, ProductId, StoreId, SupplierId};

use super::{Repositories, ServiceResult};
use crate::ledger::StockLedger;

/// Rows returned by the delivery report.
pub const DELIVERY_REPORT_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReportRow {
    pub store_id: StoreId,
    pub store_name: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub total_quantity: u64,
}

#[derive(Clone)]
pub struct ReportService {
    repos: Repositories,
    ledger: Arc<dyn StockLedger>,
}

impl ReportService {
    pub fn new(repos: Repositories, ledger: Arc<dyn StockLedger>) -> Self {
        Self { repos, ledger }
    }

    /// Top (store, product) pairs by approved delivered quantity.
    #[instrument(skip(self))]
    pub fn delivery_report(&self) -> ServiceResult<Vec<DeliveryReportRow>> {
        let mut totals: HashMap<(StoreId, ProductId), u64> = HashMap::new();
        for d in self.repos.deliveries.list() {
            if !d.is_approved() {
                continue;
            }
            if let (Some(store), Some(product)) = (d.store_id(), d.product_id()) {
                let total = totals.entry((store, product)).or_default();
                *total = total.saturating_add(d.quantity());
            }
        }

        let mut ranked: Vec<((StoreId, ProductId), u64)> = totals.into_iter().collect();
        // Ties broken by key so the order is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(DELIVERY_REPORT_SIZE);

        ranked
            .into_iter()
            .map(|((store_id, product_id), total_quantity)| {
                Ok(DeliveryReportRow {
                    store_id,
                    store_name: self.repos.store(store_id)?.name().to_string(),
                    product_id,
                    product_name: self.repos.product(product_id)?.name().to_string(),
                    total_quantity,
                })
            })
            .collect()
    }

    /// Units on hand across all of a store's entries.
    pub async fn store_total_stock(&self, store_id: StoreId) -> ServiceResult<u64> {
        self.repos.store(store_id)?;
        Ok(self
            .ledger
            .entries_for_store(store_id)
            .await?
            .iter()
            .map(|e| e.quantity())
            .fold(0u64, u64::saturating_add))
    }

    /// Units across all of a supplier's deliveries, approved or not.
    pub fn supplier_total_deliveries(&self, supplier_id: SupplierId) -> ServiceResult<u64> {
        self.repos.supplier(supplier_id)?;
        Ok(self
            .repos
            .deliveries
            .list()
            .iter()
            .filter(|d| d.supplier_id() == Some(supplier_id))
            .map(|d| d.quantity())
            .fold(0u64, u64::saturating_add))
    }

    pub fn customer_purchase_count(&self, customer_id: CustomerId) -> ServiceResult<usize> {
        self.repos.customer(customer_id)?;
        Ok(self
            .repos
            .purchases
            .list()
            .iter()
            .filter(|p| p.customer_id() == customer_id)
            .count())
    }
}
