use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use storeledger_catalog::{CustomerId, ProductId, StoreId};
use storeledger_core::{AggregateId, DomainError, Money};
use storeledger_inventory::{AdjustStock, StockKey, StockMovement};
use storeledger_sales::{Cart, CartLine, CartLineId, Purchase, PurchaseDetail, PurchaseId};

use super::{Repositories, ServiceError, ServiceResult};
use crate::ledger::{LedgerError, StockLedger};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub customer_id: CustomerId,
    pub lines: Vec<CartLine>,
    pub total: Money,
    pub item_count: u64,
    /// Store of the first line.
    pub store_id: Option<StoreId>,
}

/// A cart line checkout could not fulfil.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    pub line: CartLine,
    pub available: u64,
}

/// Checkout result. `purchase` is `None` when every line was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub purchase: Option<Purchase>,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Clone)]
pub struct CartService {
    repos: Repositories,
    ledger: Arc<dyn StockLedger>,
}

impl CartService {
    pub fn new(repos: Repositories, ledger: Arc<dyn StockLedger>) -> Self {
        Self { repos, ledger }
    }

    /// Add one unit; returns the cart's item count.
    #[instrument(skip(self))]
    pub fn add_to_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        store_id: StoreId,
    ) -> ServiceResult<u64> {
        self.repos.customer(customer_id)?;
        let product = self.repos.product(product_id)?;
        self.repos.store(store_id)?;

        let now = Utc::now();
        let mut result: Result<u64, DomainError> = Ok(0);
        self.repos.carts.upsert_with(
            customer_id,
            &mut || Cart::new(customer_id),
            &mut |cart| {
                let added = cart
                    .add_item(
                        CartLineId::new(AggregateId::new()),
                        product_id,
                        store_id,
                        product.price(),
                        now,
                    )
                    .map(|_| ());
                result = added.map(|()| cart.item_count());
            },
        );
        Ok(result?)
    }

    /// Remove a line; returns the cart's item count.
    #[instrument(skip(self))]
    pub fn remove_from_cart(&self, customer_id: CustomerId, line_id: CartLineId) -> ServiceResult<u64> {
        let mut result: Result<u64, DomainError> = Err(DomainError::NotFound);
        self.repos.carts.update(&customer_id, &mut |cart| {
            result = cart.remove_line(line_id).map(|_| cart.item_count());
        });
        result.map_err(|e| match e {
            DomainError::NotFound => ServiceError::NotFound("cart line"),
            other => other.into(),
        })
    }

    pub fn view_cart(&self, customer_id: CustomerId) -> CartView {
        let cart = self
            .repos
            .carts
            .get(&customer_id)
            .unwrap_or_else(|| Cart::new(customer_id));
        CartView {
            customer_id,
            lines: cart.lines().to_vec(),
            total: cart.total(),
            item_count: cart.item_count(),
            store_id: cart.first_store(),
        }
    }

    /// Convert the cart into a purchase.
    ///
    /// Each line is decremented with its own OUT adjustment. A line the
    /// ledger rejects for insufficient stock is skipped: no line item, stock
    /// untouched. All lines present at the start leave the cart. A storage
    /// failure undoes the lines already taken and puts the cart back.
    #[instrument(skip(self))]
    pub async fn checkout(&self, customer_id: CustomerId) -> ServiceResult<Receipt> {
        self.repos.customer(customer_id)?;

        let mut lines: Vec<CartLine> = Vec::new();
        self.repos
            .carts
            .update(&customer_id, &mut |cart| lines = cart.take_all());

        let Some(store_id) = lines.first().map(|l| l.store_id) else {
            return Err(ServiceError::CartEmpty);
        };

        let now = Utc::now();
        let mut details: Vec<PurchaseDetail> = Vec::new();
        let mut taken: Vec<StockMovement> = Vec::new();
        let mut skipped: Vec<SkippedLine> = Vec::new();

        for line in &lines {
            let key = StockKey::new(line.product_id, line.store_id);
            match self
                .ledger
                .adjust(AdjustStock::outbound(key, line.quantity, now))
                .await
            {
                Ok(movement) => {
                    details.push(PurchaseDetail {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                    });
                    taken.push(movement);
                }
                Err(LedgerError::Domain(DomainError::InsufficientStock { available, .. })) => {
                    warn!(line_id = %line.id, requested = line.quantity, available, "cart line skipped");
                    skipped.push(SkippedLine {
                        line: line.clone(),
                        available,
                    });
                }
                Err(e) => {
                    self.abort_checkout(customer_id, &taken, lines.clone()).await;
                    return Err(e.into());
                }
            }
        }

        let purchase = if details.is_empty() {
            None
        } else {
            let purchase = Purchase::record(
                PurchaseId::new(AggregateId::new()),
                customer_id,
                store_id,
                now,
                details,
            )?;
            self.repos.purchases.upsert(purchase.id_typed(), purchase.clone());
            info!(
                purchase_id = %purchase.id_typed(),
                total = %purchase.total_amount(),
                skipped = skipped.len(),
                "purchase recorded"
            );
            Some(purchase)
        };

        Ok(Receipt { purchase, skipped })
    }

    async fn abort_checkout(&self, customer_id: CustomerId, taken: &[StockMovement], lines: Vec<CartLine>) {
        for m in taken {
            let undo = AdjustStock::inbound(m.key(), m.quantity, Utc::now());
            if let Err(e) = self.ledger.adjust(undo).await {
                error!(movement_id = %m.movement_id, error = %e, "failed to return stock after aborted checkout");
            }
        }
        self.repos.carts.upsert_with(
            customer_id,
            &mut || Cart::new(customer_id),
            &mut |cart| cart.restore_lines(lines.clone()),
        );
    }

    /// A customer's purchases, newest first.
    pub fn purchases_for(&self, customer_id: CustomerId) -> Vec<Purchase> {
        let mut purchases: Vec<Purchase> = self
            .repos
            .purchases
            .list()
            .into_iter()
            .filter(|p| p.customer_id() == customer_id)
            .collect();
        purchases.sort_by_key(|p| std::cmp::Reverse(p.purchased_at()));
        purchases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storeledger_catalog::{NewCustomer, NewProduct, NewStore};
    use storeledger_core::UserId;

    use crate::ledger::publishing::ClosedBus;
    use crate::ledger::{InMemoryStockLedger, PublishingStockLedger};
    use crate::services::{Repositories, Services};

    struct Fixture {
        svc: Services,
        customer: CustomerId,
        store: StoreId,
    }

    fn fixture() -> Fixture {
        fixture_over(Services::in_memory())
    }

    fn fixture_over(svc: Services) -> Fixture {
        let store = svc
            .catalog
            .register_store(NewStore {
                name: "Centro".into(),
                street: "Calle Mayor 1".into(),
                phone: None,
            })
            .unwrap()
            .id_typed();
        let customer = svc
            .catalog
            .register_customer(NewCustomer {
                user_id: UserId::new(),
                name: "Lucia".into(),
                email: "lucia@example.com".into(),
                phone: None,
                street: None,
                tax_id: "12345678Z".into(),
            })
            .unwrap()
            .id_typed();
        Fixture { svc, customer, store }
    }

    fn product(f: &Fixture, name: &str, cents: u64) -> ProductId {
        f.svc
            .catalog
            .register_product(NewProduct {
                name: name.into(),
                description: None,
                price: Money::from_cents(cents),
            })
            .unwrap()
            .id_typed()
    }

    async fn stock(f: &Fixture, product: ProductId, qty: u64) {
        f.svc
            .ledger
            .adjust(AdjustStock::inbound(StockKey::new(product, f.store), qty, Utc::now()))
            .await
            .unwrap();
    }

    async fn qty(f: &Fixture, product: ProductId) -> u64 {
        f.svc.ledger.quantity(StockKey::new(product, f.store)).await.unwrap()
    }

    #[test]
    fn cart_count_is_units_across_lines() {
        let f = fixture();
        let a = product(&f, "Cafe", 250);
        let b = product(&f, "Te", 100);

        assert_eq!(f.svc.carts.add_to_cart(f.customer, a, f.store).unwrap(), 1);
        assert_eq!(f.svc.carts.add_to_cart(f.customer, a, f.store).unwrap(), 2);
        assert_eq!(f.svc.carts.add_to_cart(f.customer, b, f.store).unwrap(), 3);

        let view = f.svc.carts.view_cart(f.customer);
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.total, Money::from_cents(600));
        assert_eq!(view.store_id, Some(f.store));

        let line = view.lines[0].id;
        assert_eq!(f.svc.carts.remove_from_cart(f.customer, line).unwrap(), 1);
        assert!(matches!(
            f.svc.carts.remove_from_cart(f.customer, line),
            Err(ServiceError::NotFound("cart line"))
        ));
    }

    #[test]
    fn adding_unknown_product_is_not_found() {
        let f = fixture();
        let err = f
            .svc
            .carts
            .add_to_cart(f.customer, ProductId::new(AggregateId::new()), f.store)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("product")));
    }

    #[tokio::test]
    async fn checkout_of_empty_cart_creates_no_purchase() {
        let f = fixture();
        let err = f.svc.carts.checkout(f.customer).await.unwrap_err();
        assert!(matches!(err, ServiceError::CartEmpty));
        assert!(f.svc.carts.purchases_for(f.customer).is_empty());
    }

    #[tokio::test]
    async fn checkout_decrements_stock_and_records_line_items() {
        let f = fixture();
        let p = product(&f, "Cafe", 250);
        stock(&f, p, 5).await;
        for _ in 0..3 {
            f.svc.carts.add_to_cart(f.customer, p, f.store).unwrap();
        }

        let receipt = f.svc.carts.checkout(f.customer).await.unwrap();

        let purchase = receipt.purchase.unwrap();
        assert!(receipt.skipped.is_empty());
        assert_eq!(purchase.details().len(), 1);
        assert_eq!(purchase.details()[0].quantity, 3);
        assert_eq!(purchase.total_amount(), Money::from_cents(750));
        assert_eq!(purchase.store_id(), f.store);
        assert_eq!(qty(&f, p).await, 2);
        assert_eq!(f.svc.carts.view_cart(f.customer).item_count, 0);
        assert_eq!(f.svc.carts.purchases_for(f.customer).len(), 1);
    }

    #[tokio::test]
    async fn line_beyond_available_is_skipped_without_line_item() {
        let f = fixture();
        let short = product(&f, "Cafe", 250);
        let plenty = product(&f, "Te", 100);
        stock(&f, short, 2).await;
        stock(&f, plenty, 10).await;
        for _ in 0..3 {
            f.svc.carts.add_to_cart(f.customer, short, f.store).unwrap();
        }
        f.svc.carts.add_to_cart(f.customer, plenty, f.store).unwrap();

        let receipt = f.svc.carts.checkout(f.customer).await.unwrap();

        assert_eq!(qty(&f, short).await, 2);
        assert_eq!(qty(&f, plenty).await, 9);
        let purchase = receipt.purchase.unwrap();
        assert_eq!(purchase.details().len(), 1);
        assert_eq!(purchase.details()[0].product_id, plenty);
        assert_eq!(receipt.skipped.len(), 1);
        assert_eq!(receipt.skipped[0].line.product_id, short);
        assert_eq!(receipt.skipped[0].available, 2);
        assert!(f.svc.carts.view_cart(f.customer).lines.is_empty());
    }

    #[tokio::test]
    async fn all_lines_skipped_records_no_purchase() {
        let f = fixture();
        let p = product(&f, "Cafe", 250);
        f.svc.carts.add_to_cart(f.customer, p, f.store).unwrap();

        let receipt = f.svc.carts.checkout(f.customer).await.unwrap();

        assert!(receipt.purchase.is_none());
        assert_eq!(receipt.skipped.len(), 1);
        assert_eq!(receipt.skipped[0].available, 0);
        assert!(f.svc.carts.purchases_for(f.customer).is_empty());
    }

    #[tokio::test]
    async fn checkout_completes_when_movements_cannot_be_published() {
        let ledger = PublishingStockLedger::new(InMemoryStockLedger::new(), ClosedBus);
        let f = fixture_over(Services::new(Arc::new(ledger), Repositories::in_memory()));
        let p = product(&f, "Cafe", 250);
        stock(&f, p, 5).await;
        f.svc.carts.add_to_cart(f.customer, p, f.store).unwrap();

        let receipt = f.svc.carts.checkout(f.customer).await.unwrap();

        assert!(receipt.purchase.is_some());
        assert_eq!(qty(&f, p).await, 4);
        assert_eq!(f.svc.carts.view_cart(f.customer).item_count, 0);
        assert_eq!(f.svc.carts.purchases_for(f.customer).len(), 1);
    }
}
