use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeledger_catalog::{CustomerId, ProductId, StoreId};
use storeledger_core::{AggregateId, DomainError, DomainResult, Entity, Money};

/// Purchase identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(pub AggregateId);

impl PurchaseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Line item of a purchase: what was actually sold and at which price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDetail {
    pub product_id: ProductId,
    pub quantity: u64,
    pub unit_price: Money,
}

impl PurchaseDetail {
    pub fn total_price(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A completed checkout. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    id: PurchaseId,
    customer_id: CustomerId,
    store_id: StoreId,
    purchased_at: DateTime<Utc>,
    details: Vec<PurchaseDetail>,
}

impl Purchase {
    /// Build a purchase from the line items that were fulfilled.
    pub fn record(
        id: PurchaseId,
        customer_id: CustomerId,
        store_id: StoreId,
        purchased_at: DateTime<Utc>,
        details: Vec<PurchaseDetail>,
    ) -> DomainResult<Self> {
        if details.is_empty() {
            return Err(DomainError::validation("a purchase needs at least one line item"));
        }
        if details.iter().any(|d| d.quantity == 0) {
            return Err(DomainError::validation("line item quantity must be positive"));
        }

        Ok(Self {
            id,
            customer_id,
            store_id,
            purchased_at,
            details,
        })
    }

    pub fn id_typed(&self) -> PurchaseId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn purchased_at(&self) -> DateTime<Utc> {
        self.purchased_at
    }

    pub fn details(&self) -> &[PurchaseDetail] {
        &self.details
    }

    pub fn total_amount(&self) -> Money {
        self.details.iter().map(PurchaseDetail::total_price).sum()
    }
}

impl Entity for Purchase {
    type Id = PurchaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn detail(quantity: u64, cents: u64) -> PurchaseDetail {
        PurchaseDetail {
            product_id: ProductId::new(AggregateId::new()),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    fn record(details: Vec<PurchaseDetail>) -> DomainResult<Purchase> {
        Purchase::record(
            PurchaseId::new(AggregateId::new()),
            CustomerId::new(AggregateId::new()),
            StoreId::new(AggregateId::new()),
            Utc::now(),
            details,
        )
    }

    #[test]
    fn purchase_without_line_items_is_rejected() {
        assert!(matches!(record(Vec::new()), Err(DomainError::Validation(_))));
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let p = record(vec![detail(3, 150), detail(1, 1000)]).unwrap();
        assert_eq!(p.total_amount(), Money::from_cents(1450));
    }

    proptest! {
        #[test]
        fn total_matches_manual_sum(lines in prop::collection::vec((1u64..100, 0u64..100_000), 1..20)) {
            let expected: u64 = lines.iter().map(|(q, c)| q * c).sum();
            let p = record(lines.into_iter().map(|(q, c)| detail(q, c)).collect()).unwrap();
            prop_assert_eq!(p.total_amount().cents(), expected);
        }
    }
}
