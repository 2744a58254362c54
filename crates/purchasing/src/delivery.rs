use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeledger_catalog::{ProductId, StoreId, SupplierId};
use storeledger_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use storeledger_events::Event;

/// Supplier delivery identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub AggregateId);

impl DeliveryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: a supplier's delivery of one product to one store.
///
/// Deliveries are created unapproved and move to approved exactly once.
/// Approval is what adds the delivered quantity to stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDelivery {
    id: DeliveryId,
    supplier_id: Option<SupplierId>,
    store_id: Option<StoreId>,
    product_id: Option<ProductId>,
    quantity: u64,
    delivered_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    approved: bool,
    version: u64,
    created: bool,
}

impl SupplierDelivery {
    /// Create an empty, not-yet-registered instance.
    pub fn empty(id: DeliveryId) -> Self {
        Self {
            id,
            supplier_id: None,
            store_id: None,
            product_id: None,
            quantity: 0,
            delivered_at: None,
            approved_at: None,
            approved: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DeliveryId {
        self.id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.store_id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn is_approved(&self) -> bool {
        self.approved
    }

    pub fn is_registered(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for SupplierDelivery {
    type Id = DeliveryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterDelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDelivery {
    pub delivery_id: DeliveryId,
    pub supplier_id: SupplierId,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveDelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveDelivery {
    pub delivery_id: DeliveryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryCommand {
    Register(RegisterDelivery),
    Approve(ApproveDelivery),
}

/// Event: DeliveryRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRegistered {
    pub delivery_id: DeliveryId,
    pub supplier_id: SupplierId,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryApproved.
///
/// Carries the product, store and quantity so the caller can apply the
/// matching inbound stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryApproved {
    pub delivery_id: DeliveryId,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryEvent {
    DeliveryRegistered(DeliveryRegistered),
    DeliveryApproved(DeliveryApproved),
}

impl Event for DeliveryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeliveryEvent::DeliveryRegistered(_) => "purchasing.delivery.registered",
            DeliveryEvent::DeliveryApproved(_) => "purchasing.delivery.approved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeliveryEvent::DeliveryRegistered(e) => e.occurred_at,
            DeliveryEvent::DeliveryApproved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SupplierDelivery {
    type Command = DeliveryCommand;
    type Event = DeliveryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DeliveryEvent::DeliveryRegistered(e) => {
                self.id = e.delivery_id;
                self.supplier_id = Some(e.supplier_id);
                self.store_id = Some(e.store_id);
                self.product_id = Some(e.product_id);
                self.quantity = e.quantity;
                self.delivered_at = Some(e.occurred_at);
                self.approved = false;
                self.created = true;
            }
            DeliveryEvent::DeliveryApproved(e) => {
                self.approved = true;
                self.approved_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DeliveryCommand::Register(cmd) => self.handle_register(cmd),
            DeliveryCommand::Approve(cmd) => self.handle_approve(cmd),
        }
    }
}

impl SupplierDelivery {
    fn ensure_delivery_id(&self, delivery_id: DeliveryId) -> Result<(), DomainError> {
        if self.id != delivery_id {
            return Err(DomainError::invariant("delivery_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterDelivery) -> Result<Vec<DeliveryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("delivery already exists"));
        }
        self.ensure_delivery_id(cmd.delivery_id)?;

        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![DeliveryEvent::DeliveryRegistered(DeliveryRegistered {
            delivery_id: cmd.delivery_id,
            supplier_id: cmd.supplier_id,
            store_id: cmd.store_id,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveDelivery) -> Result<Vec<DeliveryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_delivery_id(cmd.delivery_id)?;

        // Approval is one-way; approving again is a no-op.
        if self.approved {
            return Ok(Vec::new());
        }

        let (Some(store_id), Some(product_id)) = (self.store_id, self.product_id) else {
            return Err(DomainError::invariant("registered delivery lacks store or product"));
        };

        Ok(vec![DeliveryEvent::DeliveryApproved(DeliveryApproved {
            delivery_id: cmd.delivery_id,
            store_id,
            product_id,
            quantity: self.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registered(quantity: u64) -> SupplierDelivery {
        let id = DeliveryId::new(AggregateId::new());
        let mut d = SupplierDelivery::empty(id);
        d.execute(&DeliveryCommand::Register(RegisterDelivery {
            delivery_id: id,
            supplier_id: SupplierId::new(AggregateId::new()),
            store_id: StoreId::new(AggregateId::new()),
            product_id: ProductId::new(AggregateId::new()),
            quantity,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        d
    }

    fn approve(d: &SupplierDelivery) -> DeliveryCommand {
        DeliveryCommand::Approve(ApproveDelivery {
            delivery_id: d.id_typed(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn registered_delivery_starts_unapproved() {
        let d = registered(12);
        assert!(d.is_registered());
        assert!(!d.is_approved());
        assert_eq!(d.quantity(), 12);
        assert!(d.delivered_at().is_some());
    }

    #[test]
    fn zero_quantity_delivery_is_rejected() {
        let id = DeliveryId::new(AggregateId::new());
        let d = SupplierDelivery::empty(id);
        let err = d
            .handle(&DeliveryCommand::Register(RegisterDelivery {
                delivery_id: id,
                supplier_id: SupplierId::new(AggregateId::new()),
                store_id: StoreId::new(AggregateId::new()),
                product_id: ProductId::new(AggregateId::new()),
                quantity: 0,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn approval_emits_quantity_once() {
        let mut d = registered(8);
        let cmd = approve(&d);

        let first = d.execute(&cmd).unwrap();
        assert_eq!(first.len(), 1);
        match &first[0] {
            DeliveryEvent::DeliveryApproved(e) => assert_eq!(e.quantity, 8),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(d.is_approved());

        let second = d.execute(&cmd).unwrap();
        assert!(second.is_empty());
        assert!(d.is_approved());
    }

    #[test]
    fn approving_unknown_delivery_is_not_found() {
        let d = SupplierDelivery::empty(DeliveryId::new(AggregateId::new()));
        assert_eq!(d.handle(&approve(&d)).unwrap_err(), DomainError::NotFound);
    }

    #[test]
    fn registering_twice_conflicts() {
        let d = registered(1);
        let err = d
            .handle(&DeliveryCommand::Register(RegisterDelivery {
                delivery_id: d.id_typed(),
                supplier_id: SupplierId::new(AggregateId::new()),
                store_id: StoreId::new(AggregateId::new()),
                product_id: ProductId::new(AggregateId::new()),
                quantity: 1,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    proptest! {
        /// Property: however many times approval is requested, exactly one
        /// approval event is ever emitted.
        #[test]
        fn repeated_approval_emits_one_event(quantity in 1u64..10_000, attempts in 1usize..10) {
            let mut d = registered(quantity);
            let cmd = approve(&d);
            let mut emitted = 0usize;
            for _ in 0..attempts {
                emitted += d.execute(&cmd).unwrap().len();
            }
            prop_assert_eq!(emitted, 1);
            prop_assert!(d.is_approved());
        }
    }
}
