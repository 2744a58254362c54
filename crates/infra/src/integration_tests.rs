//! End-to-end flows across services over one in-memory ledger.
//!
//! delivery approval -> transfer -> checkout, with movements published.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::Value as JsonValue;

    use storeledger_catalog::{NewCustomer, NewProduct, NewStore, NewSupplier, ProductId, StoreId};
    use storeledger_core::{Money, UserId};
    use storeledger_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use storeledger_inventory::{MovementDirection, StockKey, TransferOutcome};

    use crate::ledger::{InMemoryStockLedger, MovementFilter, PublishingStockLedger, StockLedger};
    use crate::services::{Repositories, Services};

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn wired() -> (Services, Bus) {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let ledger = PublishingStockLedger::new(InMemoryStockLedger::new(), bus.clone());
        (Services::new(Arc::new(ledger), Repositories::in_memory()), bus)
    }

    fn store(svc: &Services, name: &str) -> StoreId {
        svc.catalog
            .register_store(NewStore {
                name: name.into(),
                street: format!("{name} street 1"),
                phone: None,
            })
            .unwrap()
            .id_typed()
    }

    #[tokio::test]
    async fn delivery_transfer_checkout_flow() {
        let (svc, bus) = wired();
        let events = bus.subscribe();

        let north = store(&svc, "North");
        let south = store(&svc, "South");
        let milk: ProductId = svc
            .catalog
            .register_product(NewProduct {
                name: "Milk".into(),
                description: Some("1L".into()),
                price: Money::from_cents(120),
            })
            .unwrap()
            .id_typed();
        let supplier = svc
            .catalog
            .register_supplier(NewSupplier {
                user_id: Some(UserId::new()),
                name: "Dairy Co".into(),
                contact_person: Some("Ana".into()),
                phone: None,
                email: "orders@dairy.test".into(),
                street: None,
                tax_id: "B87654321".into(),
            })
            .unwrap()
            .id_typed();

        // 10 units arrive at North.
        let delivery = svc.deliveries.register(supplier, north, milk, 10).unwrap();
        assert_eq!(svc.ledger.quantity(StockKey::new(milk, north)).await.unwrap(), 0);
        svc.deliveries.approve(delivery.id_typed()).await.unwrap();
        svc.deliveries.approve(delivery.id_typed()).await.unwrap();
        assert_eq!(svc.ledger.quantity(StockKey::new(milk, north)).await.unwrap(), 10);

        // Half goes south.
        let outcome = svc.stock.transfer(milk, north, south, 5).await.unwrap();
        assert!(matches!(outcome, TransferOutcome::Completed { .. }));

        // Customer wants 7 from South; only 5 are there.
        let customer = svc
            .catalog
            .register_customer(NewCustomer {
                user_id: UserId::new(),
                name: "Marta".into(),
                email: "marta@example.com".into(),
                phone: None,
                street: None,
                tax_id: "00000000T".into(),
            })
            .unwrap()
            .id_typed();
        for _ in 0..7 {
            svc.carts.add_to_cart(customer, milk, south).unwrap();
        }
        let receipt = svc.carts.checkout(customer).await.unwrap();

        assert!(receipt.purchase.is_none());
        assert_eq!(receipt.skipped.len(), 1);
        assert_eq!(receipt.skipped[0].available, 5);
        assert!(svc.carts.view_cart(customer).lines.is_empty());

        // Now 4 fits.
        for _ in 0..4 {
            svc.carts.add_to_cart(customer, milk, south).unwrap();
        }
        let receipt = svc.carts.checkout(customer).await.unwrap();
        let purchase = receipt.purchase.expect("purchase recorded");
        assert_eq!(purchase.total_amount(), Money::from_cents(480));
        assert_eq!(svc.ledger.quantity(StockKey::new(milk, south)).await.unwrap(), 1);
        assert_eq!(svc.reports.store_total_stock(north).await.unwrap(), 5);

        // IN (approval) + OUT/IN (transfer) + OUT (checkout).
        let all = svc.stock.movements(&MovementFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        let outs = svc
            .stock
            .movements(&MovementFilter {
                direction: Some(MovementDirection::Out),
                ..MovementFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(outs.len(), 2);

        let mut published = Vec::new();
        while let Ok(env) = events.recv_timeout(Duration::from_millis(50)) {
            published.push(env);
        }
        assert_eq!(published.len(), 4);
        assert!(published.iter().all(|e| e.event_type() == "stock.movement.recorded"));
        assert!(published.windows(2).all(|w| w[0].sequence_number() < w[1].sequence_number()));
    }

    #[tokio::test]
    async fn stock_never_goes_negative_under_concurrent_checkouts() {
        let (svc, _bus) = wired();
        let shop = store(&svc, "Shop");
        let bread = svc
            .catalog
            .register_product(NewProduct {
                name: "Bread".into(),
                description: None,
                price: Money::from_cents(90),
            })
            .unwrap()
            .id_typed();
        svc.ledger
            .adjust(storeledger_inventory::AdjustStock::inbound(
                StockKey::new(bread, shop),
                3,
                chrono::Utc::now(),
            ))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..6 {
            let customer = svc
                .catalog
                .register_customer(NewCustomer {
                    user_id: UserId::new(),
                    name: format!("c{i}"),
                    email: format!("c{i}@example.com"),
                    phone: None,
                    street: None,
                    tax_id: format!("T{i}"),
                })
                .unwrap()
                .id_typed();
            svc.carts.add_to_cart(customer, bread, shop).unwrap();
            let carts = svc.carts.clone();
            handles.push(tokio::spawn(async move { carts.checkout(customer).await }));
        }

        let mut bought = 0;
        for h in handles {
            if h.await.unwrap().unwrap().purchase.is_some() {
                bought += 1;
            }
        }
        assert_eq!(bought, 3);
        assert_eq!(svc.ledger.quantity(StockKey::new(bread, shop)).await.unwrap(), 0);
    }
}
