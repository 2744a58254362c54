use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeledger_catalog::{ProductId, StoreId};
use storeledger_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use storeledger_events::Event;

/// Identity of a stock entry: one per (product, store) pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub store_id: StoreId,
}

impl StockKey {
    pub fn new(product_id: ProductId, store_id: StoreId) -> Self {
        Self {
            product_id,
            store_id,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.product_id, self.store_id)
    }
}

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementDirection {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "IN",
            MovementDirection::Out => "OUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Some(MovementDirection::In),
            "OUT" => Some(MovementDirection::Out),
            _ => None,
        }
    }
}

impl core::fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock movement identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub AggregateId);

impl MovementId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for MovementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Command: adjust the quantity of one stock entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub movement_id: MovementId,
    pub key: StockKey,
    pub amount: u64,
    pub direction: MovementDirection,
    pub occurred_at: DateTime<Utc>,
}

impl AdjustStock {
    pub fn new(key: StockKey, amount: u64, direction: MovementDirection, occurred_at: DateTime<Utc>) -> Self {
        Self {
            movement_id: MovementId::new(AggregateId::new()),
            key,
            amount,
            direction,
            occurred_at,
        }
    }

    pub fn inbound(key: StockKey, amount: u64, occurred_at: DateTime<Utc>) -> Self {
        Self::new(key, amount, MovementDirection::In, occurred_at)
    }

    pub fn outbound(key: StockKey, amount: u64, occurred_at: DateTime<Utc>) -> Self {
        Self::new(key, amount, MovementDirection::Out, occurred_at)
    }
}

/// Immutable audit record of one applied quantity change.
///
/// Movements are appended exactly once per successful adjustment and never
/// consulted to recompute balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub movement_id: MovementId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub quantity: u64,
    pub direction: MovementDirection,
    pub occurred_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id, self.store_id)
    }

    /// Signed effect of this movement on the entry's quantity.
    pub fn signed_quantity(&self) -> i128 {
        match self.direction {
            MovementDirection::In => i128::from(self.quantity),
            MovementDirection::Out => -i128::from(self.quantity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    MovementRecorded(StockMovement),
}

impl StockEvent {
    pub fn movement(&self) -> &StockMovement {
        match self {
            StockEvent::MovementRecorded(m) => m,
        }
    }

    pub fn into_movement(self) -> StockMovement {
        match self {
            StockEvent::MovementRecorded(m) => m,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::MovementRecorded(_) => "stock.movement.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::MovementRecorded(m) => m.occurred_at,
        }
    }
}

/// Aggregate root: on-hand quantity of one product at one store.
///
/// Invariant: the quantity is never negative (enforced by the `u64` type and
/// by `handle`, which refuses outbound amounts larger than what is on hand).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    key: StockKey,
    quantity: u64,
    version: u64,
}

impl StockEntry {
    /// A fresh entry with quantity 0 (what an inbound adjustment creates).
    pub fn empty(key: StockKey) -> Self {
        Self {
            key,
            quantity: 0,
            version: 0,
        }
    }

    /// Rebuild an entry loaded from storage.
    pub fn from_parts(key: StockKey, quantity: u64, version: u64) -> Self {
        Self {
            key,
            quantity,
            version,
        }
    }

    pub fn key(&self) -> StockKey {
        self.key
    }

    pub fn product_id(&self) -> ProductId {
        self.key.product_id
    }

    pub fn store_id(&self) -> StoreId {
        self.key.store_id
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn can_fulfil(&self, amount: u64) -> bool {
        self.quantity >= amount
    }
}

impl AggregateRoot for StockEntry {
    type Id = StockKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for StockEntry {
    type Command = AdjustStock;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        let StockEvent::MovementRecorded(m) = event;
        self.quantity = match m.direction {
            MovementDirection::In => self.quantity.saturating_add(m.quantity),
            MovementDirection::Out => self.quantity.saturating_sub(m.quantity),
        };

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, cmd: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if cmd.key != self.key {
            return Err(DomainError::invariant("stock key mismatch"));
        }
        if cmd.amount == 0 {
            return Err(DomainError::validation("amount must be positive"));
        }

        match cmd.direction {
            MovementDirection::Out => {
                if self.quantity < cmd.amount {
                    return Err(DomainError::insufficient_stock(cmd.amount, self.quantity));
                }
            }
            MovementDirection::In => {
                if self.quantity.checked_add(cmd.amount).is_none() {
                    return Err(DomainError::invariant("stock quantity overflow"));
                }
            }
        }

        Ok(vec![StockEvent::MovementRecorded(StockMovement {
            movement_id: cmd.movement_id,
            product_id: cmd.key.product_id,
            store_id: cmd.key.store_id,
            quantity: cmd.amount,
            direction: cmd.direction,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_key() -> StockKey {
        StockKey::new(ProductId::new(AggregateId::new()), StoreId::new(AggregateId::new()))
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn inbound_on_empty_entry_creates_quantity() {
        let key = test_key();
        let mut entry = StockEntry::empty(key);

        let events = entry.execute(&AdjustStock::inbound(key, 10, test_time())).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(entry.quantity(), 10);
        assert_eq!(entry.version(), 1);
        let m = events[0].movement();
        assert_eq!(m.quantity, 10);
        assert_eq!(m.direction, MovementDirection::In);
        assert_eq!(m.key(), key);
    }

    #[test]
    fn outbound_beyond_available_is_insufficient_stock_and_leaves_quantity() {
        let key = test_key();
        let mut entry = StockEntry::from_parts(key, 2, 1);

        let err = entry.execute(&AdjustStock::outbound(key, 3, test_time())).unwrap_err();

        assert_eq!(err, DomainError::insufficient_stock(3, 2));
        assert_eq!(entry.quantity(), 2);
        assert_eq!(entry.version(), 1);
    }

    #[test]
    fn outbound_of_exact_quantity_empties_entry() {
        let key = test_key();
        let mut entry = StockEntry::from_parts(key, 4, 0);
        entry.execute(&AdjustStock::outbound(key, 4, test_time())).unwrap();
        assert_eq!(entry.quantity(), 0);
    }

    #[test]
    fn zero_amount_is_rejected() {
        let key = test_key();
        let entry = StockEntry::from_parts(key, 4, 0);
        let err = entry.handle(&AdjustStock::inbound(key, 0, test_time())).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn command_for_another_key_is_rejected() {
        let entry = StockEntry::empty(test_key());
        let err = entry.handle(&AdjustStock::inbound(test_key(), 1, test_time())).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn direction_serializes_as_in_and_out() {
        assert_eq!(serde_json::to_string(&MovementDirection::In).unwrap(), "\"IN\"");
        assert_eq!(MovementDirection::parse("out"), Some(MovementDirection::Out));
        assert_eq!(MovementDirection::parse("sideways"), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of adjustments the quantity never goes
        /// negative, every accepted adjustment yields exactly one matching
        /// movement, and the quantity equals the signed sum of movements.
        #[test]
        fn quantity_tracks_movements_and_never_goes_negative(
            ops in prop::collection::vec((any::<bool>(), 1u64..50), 1..64)
        ) {
            let key = test_key();
            let mut entry = StockEntry::empty(key);
            let mut movements: Vec<StockMovement> = Vec::new();

            for (inbound, amount) in ops {
                let cmd = if inbound {
                    AdjustStock::inbound(key, amount, test_time())
                } else {
                    AdjustStock::outbound(key, amount, test_time())
                };
                let before = entry.quantity();

                match entry.execute(&cmd) {
                    Ok(events) => {
                        prop_assert_eq!(events.len(), 1);
                        let m = events[0].movement().clone();
                        prop_assert_eq!(m.quantity, amount);
                        prop_assert_eq!(m.direction, cmd.direction);
                        movements.push(m);
                    }
                    Err(e) => {
                        prop_assert!(!inbound);
                        prop_assert!(e.is_insufficient_stock());
                        prop_assert_eq!(entry.quantity(), before);
                    }
                }
            }

            let net: i128 = movements.iter().map(StockMovement::signed_quantity).sum();
            prop_assert!(net >= 0);
            prop_assert_eq!(net, i128::from(entry.quantity()));
            prop_assert_eq!(entry.version(), movements.len() as u64);
        }
    }
}
