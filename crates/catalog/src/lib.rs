//! Catalog and store directory: the products, stores and parties that the
//! stock ledger keys its entries by.
//!
//! Pure domain types with validating constructors; uniqueness across records
//! (emails, tax ids, supplier/store pairs) is enforced by the directory
//! service in the infrastructure layer.

pub mod party;
pub mod product;
pub mod store;
mod validate;

pub use party::{
    Customer, CustomerId, NewCustomer, NewSupplier, Supplier, SupplierId, SupplierStoreRelation,
};
pub use product::{NewProduct, Product, ProductId};
pub use store::{NewStore, Store, StoreId};
