use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use storeledger_catalog::{ProductId, StoreId, SupplierId};
use storeledger_core::{Aggregate, AggregateId, DomainError};
use storeledger_inventory::{AdjustStock, StockKey, StockMovement};
use storeledger_purchasing::{
    ApproveDelivery, DeliveryCommand, DeliveryEvent, DeliveryId, RegisterDelivery,
    SupplierDelivery,
};

use super::{Repositories, ServiceError, ServiceResult};
use crate::ledger::StockLedger;

/// Result of an approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalOutcome {
    pub delivery: SupplierDelivery,
    /// The IN movement, or `None` when the delivery was already approved.
    pub movement: Option<StockMovement>,
}

#[derive(Clone)]
pub struct DeliveryService {
    repos: Repositories,
    ledger: Arc<dyn StockLedger>,
}

impl DeliveryService {
    pub fn new(repos: Repositories, ledger: Arc<dyn StockLedger>) -> Self {
        Self { repos, ledger }
    }

    /// Register an unapproved delivery. Stock is untouched until approval.
    #[instrument(skip(self))]
    pub fn register(
        &self,
        supplier_id: SupplierId,
        store_id: StoreId,
        product_id: ProductId,
        quantity: u64,
    ) -> ServiceResult<SupplierDelivery> {
        self.repos.supplier(supplier_id)?;
        self.repos.store(store_id)?;
        self.repos.product(product_id)?;

        let delivery_id = DeliveryId::new(AggregateId::new());
        let mut delivery = SupplierDelivery::empty(delivery_id);
        delivery.execute(&DeliveryCommand::Register(RegisterDelivery {
            delivery_id,
            supplier_id,
            store_id,
            product_id,
            quantity,
            occurred_at: Utc::now(),
        }))?;

        self.repos.deliveries.upsert(delivery_id, delivery.clone());
        info!(%delivery_id, "delivery registered");
        Ok(delivery)
    }

    /// Approve a delivery and add its quantity to stock, exactly once.
    ///
    /// The approved flag is flipped under the repository write lock, so of
    /// several concurrent approvals only one sees an approval event and
    /// adjusts the ledger. If that adjustment fails the delivery is put back
    /// to its unapproved state.
    #[instrument(skip(self))]
    pub async fn approve(&self, delivery_id: DeliveryId) -> ServiceResult<ApprovalOutcome> {
        let cmd = DeliveryCommand::Approve(ApproveDelivery {
            delivery_id,
            occurred_at: Utc::now(),
        });

        let mut decided: Result<(SupplierDelivery, SupplierDelivery, Vec<DeliveryEvent>), DomainError> =
            Err(DomainError::NotFound);
        self.repos.deliveries.update(&delivery_id, &mut |delivery| {
            let before = delivery.clone();
            decided = delivery
                .execute(&cmd)
                .map(|events| (before, delivery.clone(), events));
        });

        let (before, delivery, events) = decided.map_err(|e| match e {
            DomainError::NotFound => ServiceError::NotFound("delivery"),
            other => other.into(),
        })?;

        let Some(DeliveryEvent::DeliveryApproved(approved)) = events.into_iter().next() else {
            info!("delivery already approved");
            return Ok(ApprovalOutcome {
                delivery,
                movement: None,
            });
        };

        let key = StockKey::new(approved.product_id, approved.store_id);
        match self
            .ledger
            .adjust(AdjustStock::inbound(key, approved.quantity, approved.occurred_at))
            .await
        {
            Ok(movement) => {
                info!(quantity = approved.quantity, "delivery approved");
                Ok(ApprovalOutcome {
                    delivery,
                    movement: Some(movement),
                })
            }
            Err(e) => {
                warn!(error = %e, "stock increase failed; reverting approval");
                self.repos.deliveries.upsert(delivery_id, before);
                Err(e.into())
            }
        }
    }

    pub fn get(&self, delivery_id: DeliveryId) -> ServiceResult<SupplierDelivery> {
        self.repos
            .deliveries
            .get(&delivery_id)
            .ok_or(ServiceError::NotFound("delivery"))
    }

    /// Every delivery, newest first.
    pub fn list_all(&self) -> Vec<SupplierDelivery> {
        newest_first(self.repos.deliveries.list())
    }

    /// A supplier's deliveries, newest first.
    pub fn list_for_supplier(&self, supplier_id: SupplierId) -> Vec<SupplierDelivery> {
        newest_first(
            self.repos
                .deliveries
                .list()
                .into_iter()
                .filter(|d| d.supplier_id() == Some(supplier_id))
                .collect(),
        )
    }

    /// Deliveries awaiting approval, newest first.
    pub fn list_pending(&self) -> Vec<SupplierDelivery> {
        newest_first(
            self.repos
                .deliveries
                .list()
                .into_iter()
                .filter(|d| !d.is_approved())
                .collect(),
        )
    }
}

fn newest_first(mut deliveries: Vec<SupplierDelivery>) -> Vec<SupplierDelivery> {
    deliveries.sort_by_key(|d| std::cmp::Reverse(d.delivered_at()));
    deliveries
}
