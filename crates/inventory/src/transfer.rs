//! Store-to-store transfer as a single decision over two stock entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeledger_catalog::{ProductId, StoreId};
use storeledger_core::{Aggregate, DomainError, DomainResult};

use crate::stock::{AdjustStock, StockEntry, StockKey, StockMovement};

/// Command: move `amount` units of a product from one store to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStock {
    pub product_id: ProductId,
    pub from_store: StoreId,
    pub to_store: StoreId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

impl TransferStock {
    pub fn source_key(&self) -> StockKey {
        StockKey::new(self.product_id, self.from_store)
    }

    pub fn destination_key(&self) -> StockKey {
        StockKey::new(self.product_id, self.to_store)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.amount == 0 {
            return Err(DomainError::validation("transfer amount must be positive"));
        }
        if self.from_store == self.to_store {
            return Err(DomainError::validation(
                "source and destination store must differ",
            ));
        }
        Ok(())
    }
}

/// Result of a transfer attempt.
///
/// A failed precondition is an outcome, not an error: nothing is mutated and
/// the caller learns how much was available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    Completed {
        outbound: StockMovement,
        inbound: StockMovement,
    },
    Rejected {
        requested: u64,
        available: u64,
    },
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }
}

/// Decide and apply a transfer on the two entries.
///
/// `source` is `None` when no entry exists for the source store, which fails
/// the precondition. On `Rejected` or `Err` neither entry is touched; storage
/// backends call this on working copies and persist both only on `Completed`.
pub fn execute_transfer(
    source: Option<&mut StockEntry>,
    destination: &mut StockEntry,
    cmd: &TransferStock,
) -> DomainResult<TransferOutcome> {
    cmd.validate()?;

    let Some(source) = source else {
        return Ok(TransferOutcome::Rejected {
            requested: cmd.amount,
            available: 0,
        });
    };
    if source.key() != cmd.source_key() || destination.key() != cmd.destination_key() {
        return Err(DomainError::invariant("transfer entries do not match command"));
    }
    if !source.can_fulfil(cmd.amount) {
        return Ok(TransferOutcome::Rejected {
            requested: cmd.amount,
            available: source.quantity(),
        });
    }

    let out_cmd = AdjustStock::outbound(cmd.source_key(), cmd.amount, cmd.occurred_at);
    let in_cmd = AdjustStock::inbound(cmd.destination_key(), cmd.amount, cmd.occurred_at);

    // Decide both halves before applying either.
    let out_events = source.handle(&out_cmd)?;
    let in_events = destination.handle(&in_cmd)?;

    for ev in &out_events {
        source.apply(ev);
    }
    for ev in &in_events {
        destination.apply(ev);
    }

    let outbound = out_events
        .into_iter()
        .next()
        .map(|e| e.into_movement())
        .ok_or_else(|| DomainError::invariant("outbound half produced no movement"))?;
    let inbound = in_events
        .into_iter()
        .next()
        .map(|e| e.into_movement())
        .ok_or_else(|| DomainError::invariant("inbound half produced no movement"))?;

    Ok(TransferOutcome::Completed { outbound, inbound })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::MovementDirection;
    use storeledger_core::{AggregateId, AggregateRoot};

    fn cmd(amount: u64) -> TransferStock {
        TransferStock {
            product_id: ProductId::new(AggregateId::new()),
            from_store: StoreId::new(AggregateId::new()),
            to_store: StoreId::new(AggregateId::new()),
            amount,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn transfer_moves_quantity_and_records_two_movements() {
        let cmd = cmd(5);
        let mut a = StockEntry::from_parts(cmd.source_key(), 10, 3);
        let mut b = StockEntry::empty(cmd.destination_key());

        let outcome = execute_transfer(Some(&mut a), &mut b, &cmd).unwrap();

        assert_eq!(a.quantity(), 5);
        assert_eq!(b.quantity(), 5);
        match outcome {
            TransferOutcome::Completed { outbound, inbound } => {
                assert_eq!(outbound.direction, MovementDirection::Out);
                assert_eq!(outbound.store_id, cmd.from_store);
                assert_eq!(inbound.direction, MovementDirection::In);
                assert_eq!(inbound.store_id, cmd.to_store);
                assert_eq!(outbound.quantity, 5);
                assert_eq!(inbound.quantity, 5);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn short_source_is_rejected_without_mutation() {
        let cmd = cmd(7);
        let mut a = StockEntry::from_parts(cmd.source_key(), 6, 1);
        let mut b = StockEntry::from_parts(cmd.destination_key(), 2, 1);

        let outcome = execute_transfer(Some(&mut a), &mut b, &cmd).unwrap();

        assert_eq!(
            outcome,
            TransferOutcome::Rejected {
                requested: 7,
                available: 6
            }
        );
        assert_eq!(a.quantity(), 6);
        assert_eq!(b.quantity(), 2);
        assert_eq!(b.version(), 1);
    }

    #[test]
    fn missing_source_is_rejected() {
        let cmd = cmd(1);
        let mut b = StockEntry::empty(cmd.destination_key());
        let outcome = execute_transfer(None, &mut b, &cmd).unwrap();
        assert!(!outcome.is_completed());
        assert_eq!(b.quantity(), 0);
    }

    #[test]
    fn same_store_transfer_is_invalid() {
        let mut cmd = cmd(1);
        cmd.to_store = cmd.from_store;
        let mut a = StockEntry::from_parts(cmd.source_key(), 4, 0);
        let mut b = a.clone();
        let err = execute_transfer(Some(&mut a), &mut b, &cmd).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
