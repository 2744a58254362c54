use serde::{Deserialize, Serialize};

use storeledger_core::{AggregateId, DomainError, DomainResult, Entity, Money};

use crate::validate::{optional_text, required_text};

/// Highest storable price: ten digits with two decimals.
const MAX_PRICE_CENTS: u64 = 9_999_999_999;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Input for registering a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
}

/// A sellable product. Its current price is captured into cart lines when
/// they are created, so later price changes do not affect open carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    description: Option<String>,
    price: Money,
}

impl Product {
    pub fn register(id: ProductId, input: NewProduct) -> DomainResult<Self> {
        let name = required_text("name", &input.name, 100)?;
        let description = optional_text("description", input.description, 4000)?;
        if input.price.cents() > MAX_PRICE_CENTS {
            return Err(DomainError::validation("price exceeds the maximum storable amount"));
        }
        Ok(Self {
            id,
            name,
            description,
            price: input.price,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn reprice(&mut self, price: Money) -> DomainResult<()> {
        if price.cents() > MAX_PRICE_CENTS {
            return Err(DomainError::validation("price exceeds the maximum storable amount"));
        }
        self.price = price;
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, cents: u64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price: Money::from_cents(cents),
        }
    }

    #[test]
    fn register_trims_name() {
        let p = Product::register(ProductId::new(AggregateId::new()), input("  Mouse ", 1999)).unwrap();
        assert_eq!(p.name(), "Mouse");
        assert_eq!(p.price(), Money::from_cents(1999));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = Product::register(ProductId::new(AggregateId::new()), input(" ", 10)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn price_above_ten_digits_is_rejected() {
        let err = Product::register(
            ProductId::new(AggregateId::new()),
            input("Server", MAX_PRICE_CENTS + 1),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
