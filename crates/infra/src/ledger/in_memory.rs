use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use storeledger_catalog::StoreId;
use storeledger_core::{Aggregate, DomainError};
use storeledger_inventory::{
    AdjustStock, StockEntry, StockKey, StockMovement, TransferOutcome, TransferStock,
    execute_transfer,
};

use super::{LedgerError, MovementFilter, StockLedger, keep_latest};

#[derive(Debug, Default)]
struct LedgerState {
    entries: BTreeMap<StockKey, StockEntry>,
    movements: Vec<StockMovement>,
}

/// In-memory stock ledger.
///
/// Entries and movements sit behind one mutex, so the quantity check, the
/// write and the movement append are a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryStockLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Store("lock poisoned".to_string()))
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    #[instrument(skip(self, cmd), fields(key = %cmd.key, amount = cmd.amount, direction = %cmd.direction), err)]
    async fn adjust(&self, cmd: AdjustStock) -> Result<StockMovement, LedgerError> {
        let mut state = self.lock()?;

        let mut entry = state
            .entries
            .get(&cmd.key)
            .cloned()
            .unwrap_or_else(|| StockEntry::empty(cmd.key));

        let events = entry.execute(&cmd)?;
        let movement = events
            .into_iter()
            .next()
            .map(|e| e.into_movement())
            .ok_or_else(|| DomainError::invariant("adjustment produced no movement"))?;

        let quantity = entry.quantity();
        state.entries.insert(cmd.key, entry);
        state.movements.push(movement.clone());

        info!(quantity, movement_id = %movement.movement_id, "stock adjusted");
        Ok(movement)
    }

    #[instrument(
        skip(self, cmd),
        fields(product = %cmd.product_id, from = %cmd.from_store, to = %cmd.to_store, amount = cmd.amount),
        err
    )]
    async fn transfer(&self, cmd: TransferStock) -> Result<TransferOutcome, LedgerError> {
        cmd.validate()?;

        let mut state = self.lock()?;

        let mut source = state.entries.get(&cmd.source_key()).cloned();
        let mut destination = state
            .entries
            .get(&cmd.destination_key())
            .cloned()
            .unwrap_or_else(|| StockEntry::empty(cmd.destination_key()));

        let outcome = execute_transfer(source.as_mut(), &mut destination, &cmd)?;

        match &outcome {
            TransferOutcome::Completed { outbound, inbound } => {
                if let Some(source) = source {
                    state.entries.insert(source.key(), source);
                }
                state.entries.insert(destination.key(), destination);
                state.movements.push(outbound.clone());
                state.movements.push(inbound.clone());
                info!("stock transferred");
            }
            TransferOutcome::Rejected { available, .. } => {
                warn!(available, "transfer rejected");
            }
        }

        Ok(outcome)
    }

    async fn entry(&self, key: StockKey) -> Result<Option<StockEntry>, LedgerError> {
        Ok(self.lock()?.entries.get(&key).cloned())
    }

    async fn entries(&self) -> Result<Vec<StockEntry>, LedgerError> {
        Ok(self.lock()?.entries.values().cloned().collect())
    }

    async fn entries_for_store(&self, store_id: StoreId) -> Result<Vec<StockEntry>, LedgerError> {
        Ok(self
            .lock()?
            .entries
            .values()
            .filter(|e| e.store_id() == store_id)
            .cloned()
            .collect())
    }

    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, LedgerError> {
        let state = self.lock()?;
        let mut matched: Vec<StockMovement> = state
            .movements
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        matched.sort_by_key(|m| m.occurred_at);
        Ok(keep_latest(matched, filter.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::sync::Arc;

    use storeledger_catalog::ProductId;
    use storeledger_core::AggregateId;
    use storeledger_inventory::MovementDirection;

    fn key() -> StockKey {
        StockKey::new(ProductId::new(AggregateId::new()), StoreId::new(AggregateId::new()))
    }

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().build().unwrap()
    }

    #[tokio::test]
    async fn inbound_creates_entry_and_records_movement() {
        let ledger = InMemoryStockLedger::new();
        let k = key();

        let m = ledger.adjust(AdjustStock::inbound(k, 10, Utc::now())).await.unwrap();

        assert_eq!(m.direction, MovementDirection::In);
        assert_eq!(ledger.quantity(k).await.unwrap(), 10);
        assert_eq!(ledger.movements(&MovementFilter::default()).await.unwrap(), vec![m]);
    }

    #[tokio::test]
    async fn outbound_on_missing_entry_is_insufficient_and_creates_nothing() {
        let ledger = InMemoryStockLedger::new();
        let k = key();

        let err = ledger.adjust(AdjustStock::outbound(k, 1, Utc::now())).await.unwrap_err();

        assert!(err.is_insufficient_stock());
        assert!(ledger.entry(k).await.unwrap().is_none());
        assert!(ledger.movements(&MovementFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outbound_beyond_available_leaves_quantity() {
        let ledger = InMemoryStockLedger::new();
        let k = key();
        ledger.adjust(AdjustStock::inbound(k, 2, Utc::now())).await.unwrap();

        let err = ledger.adjust(AdjustStock::outbound(k, 3, Utc::now())).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::InsufficientStock { requested: 3, available: 2 })
        ));
        assert_eq!(ledger.quantity(k).await.unwrap(), 2);
        assert_eq!(ledger.movements(&MovementFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transfer_five_of_ten() {
        let ledger = InMemoryStockLedger::new();
        let a = key();
        let b = StockKey::new(a.product_id, StoreId::new(AggregateId::new()));
        ledger.adjust(AdjustStock::inbound(a, 10, Utc::now())).await.unwrap();

        let outcome = ledger
            .transfer(TransferStock {
                product_id: a.product_id,
                from_store: a.store_id,
                to_store: b.store_id,
                amount: 5,
                occurred_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(ledger.quantity(a).await.unwrap(), 5);
        assert_eq!(ledger.quantity(b).await.unwrap(), 5);

        let filter = MovementFilter {
            product_id: Some(a.product_id),
            ..MovementFilter::default()
        };
        // one delivery IN + transfer OUT + transfer IN
        assert_eq!(ledger.movements(&filter).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rejected_transfer_mutates_nothing() {
        let ledger = InMemoryStockLedger::new();
        let a = key();
        let b = StockKey::new(a.product_id, StoreId::new(AggregateId::new()));
        ledger.adjust(AdjustStock::inbound(a, 3, Utc::now())).await.unwrap();

        let outcome = ledger
            .transfer(TransferStock {
                product_id: a.product_id,
                from_store: a.store_id,
                to_store: b.store_id,
                amount: 4,
                occurred_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Rejected { requested: 4, available: 3 });
        assert_eq!(ledger.quantity(a).await.unwrap(), 3);
        assert!(ledger.entry(b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn movement_filter_and_limit() {
        let ledger = InMemoryStockLedger::new();
        let k = key();
        for amount in 1..=4 {
            ledger.adjust(AdjustStock::inbound(k, amount, Utc::now())).await.unwrap();
        }
        ledger.adjust(AdjustStock::outbound(k, 2, Utc::now())).await.unwrap();

        let outs = ledger
            .movements(&MovementFilter {
                direction: Some(MovementDirection::Out),
                ..MovementFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(outs.len(), 1);

        let latest = ledger
            .movements(&MovementFilter {
                limit: Some(2),
                ..MovementFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[1].direction, MovementDirection::Out);
    }

    #[test]
    fn concurrent_outbound_never_oversells() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .build()
            .unwrap();
        let ledger = Arc::new(InMemoryStockLedger::new());
        let k = key();

        runtime.block_on(async {
            ledger.adjust(AdjustStock::inbound(k, 10, Utc::now())).await.unwrap();

            let mut tasks = Vec::new();
            for _ in 0..25 {
                let ledger = ledger.clone();
                tasks.push(tokio::spawn(async move {
                    ledger.adjust(AdjustStock::outbound(k, 1, Utc::now())).await.is_ok()
                }));
            }

            let mut succeeded = 0;
            for t in tasks {
                if t.await.unwrap() {
                    succeeded += 1;
                }
            }

            assert_eq!(succeeded, 10);
            assert_eq!(ledger.quantity(k).await.unwrap(), 0);
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: the stored quantity always equals the signed sum of the
        /// recorded movements and each accepted adjustment adds one movement.
        #[test]
        fn ledger_quantity_matches_movement_log(
            ops in prop::collection::vec((any::<bool>(), 1u64..20), 1..40)
        ) {
            let runtime = rt();
            let ledger = InMemoryStockLedger::new();
            let k = key();
            let mut accepted = 0usize;

            for (inbound, amount) in ops {
                let cmd = if inbound {
                    AdjustStock::inbound(k, amount, Utc::now())
                } else {
                    AdjustStock::outbound(k, amount, Utc::now())
                };
                if runtime.block_on(ledger.adjust(cmd)).is_ok() {
                    accepted += 1;
                }
            }

            let movements = runtime.block_on(ledger.movements(&MovementFilter::default())).unwrap();
            let net: i128 = movements.iter().map(StockMovement::signed_quantity).sum();
            let quantity = runtime.block_on(ledger.quantity(k)).unwrap();

            prop_assert_eq!(movements.len(), accepted);
            prop_assert!(net >= 0);
            prop_assert_eq!(net, i128::from(quantity));
        }
    }
}
