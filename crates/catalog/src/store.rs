use serde::{Deserialize, Serialize};

use storeledger_core::{AggregateId, DomainResult, Entity};

use crate::validate::{optional_text, required_text};

/// Store identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub AggregateId);

impl StoreId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StoreId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStore {
    pub name: String,
    pub street: String,
    pub phone: Option<String>,
}

/// A physical store holding stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    id: StoreId,
    name: String,
    street: String,
    phone: Option<String>,
}

impl Store {
    pub fn register(id: StoreId, input: NewStore) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: required_text("name", &input.name, 100)?,
            street: required_text("street", &input.street, 250)?,
            phone: optional_text("phone", input.phone, 15)?,
        })
    }

    pub fn id_typed(&self) -> StoreId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}

impl Entity for Store {
    type Id = StoreId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Store {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name, self.street)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn street_is_required() {
        let res = Store::register(
            StoreId::new(AggregateId::new()),
            NewStore {
                name: "Centro".into(),
                street: "".into(),
                phone: None,
            },
        );
        assert!(res.is_err());
    }

    #[test]
    fn display_shows_name_and_street() {
        let store = Store::register(
            StoreId::new(AggregateId::new()),
            NewStore {
                name: "Centro".into(),
                street: "Gran Via 1".into(),
                phone: Some("600000000".into()),
            },
        )
        .unwrap();
        assert_eq!(store.to_string(), "Centro (Gran Via 1)");
    }
}
