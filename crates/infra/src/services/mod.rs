//! Application services: the flows that drive the stock ledger.
//!
//! - `catalog`: stores, products, customers, suppliers, supplier↔store links
//! - `cart`: cart editing and checkout (ledger OUT)
//! - `deliveries`: supplier deliveries and approval (ledger IN)
//! - `stock`: dashboard queries and store transfers (ledger OUT + IN)
//! - `reports`: aggregate figures over deliveries, stock and purchases

use std::sync::Arc;

use thiserror::Error;

use storeledger_catalog::{
    Customer, CustomerId, Product, ProductId, Store, StoreId, Supplier, SupplierId,
    SupplierStoreRelation,
};
use storeledger_core::DomainError;
use storeledger_purchasing::{DeliveryId, SupplierDelivery};
use storeledger_sales::{Cart, Purchase, PurchaseId};

use crate::ledger::{InMemoryStockLedger, LedgerError, StockLedger};
use crate::repository::{InMemoryRepository, Repository};

pub mod cart;
pub mod catalog;
pub mod deliveries;
pub mod reports;
pub mod stock;

pub use cart::{CartService, CartView, Receipt, SkippedLine};
pub use catalog::{CatalogService, StoreProduct};
pub use deliveries::{ApprovalOutcome, DeliveryService};
pub use reports::{DeliveryReportRow, ReportService};
pub use stock::StockService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(DomainError),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("cart is empty")]
    CartEmpty,
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        ServiceError::Domain(value)
    }
}

impl From<LedgerError> for ServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Domain(e) => ServiceError::Domain(e),
            other => ServiceError::Ledger(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Record stores shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub stores: Arc<dyn Repository<StoreId, Store>>,
    pub products: Arc<dyn Repository<ProductId, Product>>,
    pub customers: Arc<dyn Repository<CustomerId, Customer>>,
    pub suppliers: Arc<dyn Repository<SupplierId, Supplier>>,
    pub supplier_stores: Arc<dyn Repository<(SupplierId, StoreId), SupplierStoreRelation>>,
    pub deliveries: Arc<dyn Repository<DeliveryId, SupplierDelivery>>,
    pub carts: Arc<dyn Repository<CustomerId, Cart>>,
    pub purchases: Arc<dyn Repository<PurchaseId, Purchase>>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            stores: Arc::new(InMemoryRepository::new()),
            products: Arc::new(InMemoryRepository::new()),
            customers: Arc::new(InMemoryRepository::new()),
            suppliers: Arc::new(InMemoryRepository::new()),
            supplier_stores: Arc::new(InMemoryRepository::new()),
            deliveries: Arc::new(InMemoryRepository::new()),
            carts: Arc::new(InMemoryRepository::new()),
            purchases: Arc::new(InMemoryRepository::new()),
        }
    }

    pub(crate) fn store(&self, id: StoreId) -> ServiceResult<Store> {
        self.stores.get(&id).ok_or(ServiceError::NotFound("store"))
    }

    pub(crate) fn product(&self, id: ProductId) -> ServiceResult<Product> {
        self.products.get(&id).ok_or(ServiceError::NotFound("product"))
    }

    pub(crate) fn customer(&self, id: CustomerId) -> ServiceResult<Customer> {
        self.customers.get(&id).ok_or(ServiceError::NotFound("customer"))
    }

    pub(crate) fn supplier(&self, id: SupplierId) -> ServiceResult<Supplier> {
        self.suppliers.get(&id).ok_or(ServiceError::NotFound("supplier"))
    }
}

/// Every service wired over one ledger and one set of repositories.
#[derive(Clone)]
pub struct Services {
    pub ledger: Arc<dyn StockLedger>,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub deliveries: DeliveryService,
    pub stock: StockService,
    pub reports: ReportService,
}

impl Services {
    pub fn new(ledger: Arc<dyn StockLedger>, repos: Repositories) -> Self {
        Self {
            catalog: CatalogService::new(repos.clone(), ledger.clone()),
            carts: CartService::new(repos.clone(), ledger.clone()),
            deliveries: DeliveryService::new(repos.clone(), ledger.clone()),
            stock: StockService::new(repos.clone(), ledger.clone()),
            reports: ReportService::new(repos, ledger.clone()),
            ledger,
        }
    }

    /// Fully in-memory wiring (tests/dev).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStockLedger::new()), Repositories::in_memory())
    }
}
