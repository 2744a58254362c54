//! Customers and suppliers: the parties that buy from and deliver to stores.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use storeledger_core::{AggregateId, DomainResult, Entity, UserId};

use crate::store::StoreId;
use crate::validate::{email, optional_text, required_text};

/// Customer identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub AggregateId);

impl CustomerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Supplier identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub AggregateId);

impl SupplierId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub tax_id: String,
}

/// A registered customer, linked one-to-one with a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    user_id: UserId,
    name: String,
    email: String,
    phone: Option<String>,
    street: Option<String>,
    tax_id: String,
    registered_at: DateTime<Utc>,
}

impl Customer {
    pub fn register(id: CustomerId, input: NewCustomer, registered_at: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            user_id: input.user_id,
            name: required_text("name", &input.name, 100)?,
            email: email(&input.email)?,
            phone: optional_text("phone", input.phone, 15)?,
            street: optional_text("street", input.street, 250)?,
            tax_id: required_text("tax_id", &input.tax_id, 20)?,
            registered_at,
        })
    }

    pub fn id_typed(&self) -> CustomerId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }

    pub fn tax_id(&self) -> &str {
        &self.tax_id
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub user_id: Option<UserId>,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub street: Option<String>,
    pub tax_id: String,
}

/// A supplier delivering stock to stores. The user link is optional so
/// suppliers can be registered before they get an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    user_id: Option<UserId>,
    name: String,
    contact_person: Option<String>,
    phone: Option<String>,
    email: String,
    street: Option<String>,
    tax_id: String,
}

impl Supplier {
    pub fn register(id: SupplierId, input: NewSupplier) -> DomainResult<Self> {
        Ok(Self {
            id,
            user_id: input.user_id,
            name: required_text("name", &input.name, 150)?,
            contact_person: optional_text("contact_person", input.contact_person, 50)?,
            phone: optional_text("phone", input.phone, 15)?,
            email: email(&input.email)?,
            street: optional_text("street", input.street, 250)?,
            tax_id: required_text("tax_id", &input.tax_id, 20)?,
        })
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact_person(&self) -> Option<&str> {
        self.contact_person.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }

    pub fn tax_id(&self) -> &str {
        &self.tax_id
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Contract between a supplier and a store. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierStoreRelation {
    pub supplier_id: SupplierId,
    pub store_id: StoreId,
    pub start_date: NaiveDate,
    pub contract_terms: Option<String>,
}

impl SupplierStoreRelation {
    pub fn new(
        supplier_id: SupplierId,
        store_id: StoreId,
        start_date: NaiveDate,
        contract_terms: Option<String>,
    ) -> DomainResult<Self> {
        Ok(Self {
            supplier_id,
            store_id,
            start_date,
            contract_terms: optional_text("contract_terms", contract_terms, 4000)?,
        })
    }

    pub fn key(&self) -> (SupplierId, StoreId) {
        (self.supplier_id, self.store_id)
    }
}
