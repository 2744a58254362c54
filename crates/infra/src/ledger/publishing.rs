use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::error;

use storeledger_catalog::StoreId;
use storeledger_events::{EventBus, EventEnvelope};
use storeledger_inventory::{
    AdjustStock, StockEntry, StockEvent, StockKey, StockMovement, TransferOutcome, TransferStock,
};

use super::{LedgerError, MovementFilter, StockLedger};

/// Aggregate type stamped on published movement envelopes.
pub const STOCK_AGGREGATE_TYPE: &str = "inventory.stock_entry";

/// Publishes every committed movement to an event bus.
///
/// Publication happens only after the inner ledger has committed. A publish
/// failure is logged and the committed result is still returned: callers
/// must never mistake a committed mutation for a rejected one.
#[derive(Debug)]
pub struct PublishingStockLedger<L, B> {
    inner: L,
    bus: B,
    sequence: AtomicU64,
}

impl<L, B> PublishingStockLedger<L, B> {
    pub fn new(inner: L, bus: B) -> Self {
        Self {
            inner,
            bus,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<L, B> PublishingStockLedger<L, B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn publish(&self, movement: &StockMovement) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let event = StockEvent::MovementRecorded(movement.clone());
        let envelope = match EventEnvelope::from_typed(
            STOCK_AGGREGATE_TYPE,
            movement.key().to_string(),
            sequence,
            &event,
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(movement_id = %movement.movement_id, error = %e, "failed to serialize movement");
                return;
            }
        };

        if let Err(e) = self.bus.publish(envelope) {
            error!(
                movement_id = %movement.movement_id,
                sequence,
                error = ?e,
                "movement committed but not published"
            );
        }
    }
}

#[async_trait]
impl<L, B> StockLedger for PublishingStockLedger<L, B>
where
    L: StockLedger,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    async fn adjust(&self, cmd: AdjustStock) -> Result<StockMovement, LedgerError> {
        let movement = self.inner.adjust(cmd).await?;
        self.publish(&movement);
        Ok(movement)
    }

    async fn transfer(&self, cmd: TransferStock) -> Result<TransferOutcome, LedgerError> {
        let outcome = self.inner.transfer(cmd).await?;
        if let TransferOutcome::Completed { outbound, inbound } = &outcome {
            self.publish(outbound);
            self.publish(inbound);
        }
        Ok(outcome)
    }

    async fn entry(&self, key: StockKey) -> Result<Option<StockEntry>, LedgerError> {
        self.inner.entry(key).await
    }

    async fn entries(&self) -> Result<Vec<StockEntry>, LedgerError> {
        self.inner.entries().await
    }

    async fn entries_for_store(&self, store_id: StoreId) -> Result<Vec<StockEntry>, LedgerError> {
        self.inner.entries_for_store(store_id).await
    }

    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, LedgerError> {
        self.inner.movements(filter).await
    }
}

/// A bus whose every publish fails.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ClosedBus;

#[cfg(test)]
impl EventBus<EventEnvelope<JsonValue>> for ClosedBus {
    type Error = &'static str;

    fn publish(&self, _message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        Err("bus closed")
    }

    fn subscribe(&self) -> storeledger_events::Subscription<EventEnvelope<JsonValue>> {
        let (_tx, rx) = std::sync::mpsc::channel();
        storeledger_events::Subscription::new(rx)
    }
}
