use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use storeledger_catalog::{
    Customer, CustomerId, NewCustomer, NewProduct, NewStore, NewSupplier, Product, ProductId,
    Store, StoreId, Supplier, SupplierId, SupplierStoreRelation,
};
use storeledger_core::{AggregateId, DomainError, UserId};

use super::{Repositories, ServiceError, ServiceResult};
use crate::ledger::StockLedger;

/// A product on sale at a store, with the quantity on hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreProduct {
    pub product: Product,
    pub quantity: u64,
}

#[derive(Clone)]
pub struct CatalogService {
    repos: Repositories,
    ledger: Arc<dyn StockLedger>,
}

impl CatalogService {
    pub fn new(repos: Repositories, ledger: Arc<dyn StockLedger>) -> Self {
        Self { repos, ledger }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn register_store(&self, input: NewStore) -> ServiceResult<Store> {
        let store = Store::register(StoreId::new(AggregateId::new()), input)?;
        self.repos.stores.upsert(store.id_typed(), store.clone());
        info!(store_id = %store.id_typed(), "store registered");
        Ok(store)
    }

    pub fn list_stores(&self) -> Vec<Store> {
        let mut stores = self.repos.stores.list();
        stores.sort_by(|a, b| a.name().cmp(b.name()));
        stores
    }

    pub fn store(&self, id: StoreId) -> ServiceResult<Store> {
        self.repos.store(id)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn register_product(&self, input: NewProduct) -> ServiceResult<Product> {
        let product = Product::register(ProductId::new(AggregateId::new()), input)?;
        self.repos.products.upsert(product.id_typed(), product.clone());
        info!(product_id = %product.id_typed(), "product registered");
        Ok(product)
    }

    pub fn list_products(&self) -> Vec<Product> {
        let mut products = self.repos.products.list();
        products.sort_by(|a, b| a.name().cmp(b.name()));
        products
    }

    pub fn product(&self, id: ProductId) -> ServiceResult<Product> {
        self.repos.product(id)
    }

    /// Register the customer profile of a user.
    ///
    /// One profile per user; email and tax id are unique among customers.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub fn register_customer(&self, input: NewCustomer) -> ServiceResult<Customer> {
        let customer = Customer::register(CustomerId::new(AggregateId::new()), input, Utc::now())?;
        self.repos
            .customers
            .insert_unless(customer.id_typed(), customer.clone(), &mut |c| {
                c.user_id() == customer.user_id()
                    || c.email().eq_ignore_ascii_case(customer.email())
                    || c.tax_id() == customer.tax_id()
            })
            .map_err(|existing| {
                let what = if existing.user_id() == customer.user_id() {
                    "user already has a customer profile"
                } else if existing.email().eq_ignore_ascii_case(customer.email()) {
                    "a customer with this email already exists"
                } else {
                    "a customer with this tax id already exists"
                };
                DomainError::conflict(what)
            })?;
        info!(customer_id = %customer.id_typed(), "customer registered");
        Ok(customer)
    }

    pub fn customer(&self, id: CustomerId) -> ServiceResult<Customer> {
        self.repos.customer(id)
    }

    pub fn customer_for_user(&self, user_id: UserId) -> Option<Customer> {
        self.repos
            .customers
            .list()
            .into_iter()
            .find(|c| c.user_id() == user_id)
    }

    pub fn list_customers(&self) -> Vec<Customer> {
        self.repos.customers.list()
    }

    /// Register a supplier. At most one profile per user; email and tax id
    /// are unique among suppliers.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn register_supplier(&self, input: NewSupplier) -> ServiceResult<Supplier> {
        let supplier = Supplier::register(SupplierId::new(AggregateId::new()), input)?;
        let same_user = |s: &Supplier| supplier.user_id().is_some() && s.user_id() == supplier.user_id();
        self.repos
            .suppliers
            .insert_unless(supplier.id_typed(), supplier.clone(), &mut |s| {
                same_user(s)
                    || s.email().eq_ignore_ascii_case(supplier.email())
                    || s.tax_id() == supplier.tax_id()
            })
            .map_err(|existing| {
                let what = if same_user(&existing) {
                    "user already has a supplier profile"
                } else if existing.email().eq_ignore_ascii_case(supplier.email()) {
                    "a supplier with this email already exists"
                } else {
                    "a supplier with this tax id already exists"
                };
                DomainError::conflict(what)
            })?;
        info!(supplier_id = %supplier.id_typed(), "supplier registered");
        Ok(supplier)
    }

    pub fn supplier(&self, id: SupplierId) -> ServiceResult<Supplier> {
        self.repos.supplier(id)
    }

    pub fn supplier_for_user(&self, user_id: UserId) -> Option<Supplier> {
        self.repos
            .suppliers
            .list()
            .into_iter()
            .find(|s| s.user_id() == Some(user_id))
    }

    pub fn list_suppliers(&self) -> Vec<Supplier> {
        self.repos.suppliers.list()
    }

    /// Record a supplier's contract with a store. One per pair.
    #[instrument(skip(self, contract_terms))]
    pub fn link_supplier_store(
        &self,
        supplier_id: SupplierId,
        store_id: StoreId,
        start_date: NaiveDate,
        contract_terms: Option<String>,
    ) -> ServiceResult<SupplierStoreRelation> {
        self.repos.supplier(supplier_id)?;
        self.repos.store(store_id)?;

        let relation = SupplierStoreRelation::new(supplier_id, store_id, start_date, contract_terms)?;
        if !self
            .repos
            .supplier_stores
            .insert_if_absent(relation.key(), relation.clone())
        {
            return Err(DomainError::conflict("supplier is already linked to this store").into());
        }
        info!("supplier linked to store");
        Ok(relation)
    }

    pub fn stores_of_supplier(&self, supplier_id: SupplierId) -> Vec<SupplierStoreRelation> {
        self.repos
            .supplier_stores
            .list()
            .into_iter()
            .filter(|r| r.supplier_id == supplier_id)
            .collect()
    }

    /// Products with stock on hand at a store.
    #[instrument(skip(self))]
    pub async fn store_products(&self, store_id: StoreId) -> ServiceResult<Vec<StoreProduct>> {
        self.repos.store(store_id)?;

        let mut out = Vec::new();
        for entry in self.ledger.entries_for_store(store_id).await? {
            if entry.quantity() == 0 {
                continue;
            }
            match self.repos.products.get(&entry.product_id()) {
                Some(product) => out.push(StoreProduct {
                    product,
                    quantity: entry.quantity(),
                }),
                None => return Err(ServiceError::NotFound("product")),
            }
        }
        out.sort_by(|a, b| a.product.name().cmp(b.product.name()));
        Ok(out)
    }
}
