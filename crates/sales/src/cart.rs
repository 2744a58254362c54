use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeledger_catalog::{CustomerId, ProductId, StoreId};
use storeledger_core::{AggregateId, DomainError, DomainResult, Entity, Money};

/// Cart line identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLineId(pub AggregateId);

impl CartLineId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CartLineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A pending purchase of one product from one store.
///
/// `unit_price` is the product price at the moment the line was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub quantity: u64,
    pub unit_price: Money,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A customer's cart. One per customer; lines are kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    customer_id: CustomerId,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            lines: Vec::new(),
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Add one unit of a product from a store.
    ///
    /// An existing line for the same (product, store) is incremented and keeps
    /// its captured price; otherwise a new line is created with `line_id`.
    pub fn add_item(
        &mut self,
        line_id: CartLineId,
        product_id: ProductId,
        store_id: StoreId,
        unit_price: Money,
        added_at: DateTime<Utc>,
    ) -> DomainResult<&CartLine> {
        if let Some(idx) = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id && l.store_id == store_id)
        {
            let line = &mut self.lines[idx];
            line.quantity = line
                .quantity
                .checked_add(1)
                .ok_or_else(|| DomainError::invariant("cart line quantity overflow"))?;
            return Ok(&self.lines[idx]);
        }

        if self.lines.iter().any(|l| l.id == line_id) {
            return Err(DomainError::conflict("cart line id already in use"));
        }

        self.lines.push(CartLine {
            id: line_id,
            product_id,
            store_id,
            quantity: 1,
            unit_price,
            added_at,
        });
        let last = self.lines.len() - 1;
        Ok(&self.lines[last])
    }

    pub fn remove_line(&mut self, id: CartLineId) -> DomainResult<CartLine> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.id == id)
            .ok_or(DomainError::NotFound)?;
        Ok(self.lines.remove(idx))
    }

    /// Take every line out of the cart (checkout snapshot).
    pub fn take_all(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines)
    }

    /// Put lines back after an aborted checkout.
    ///
    /// A line whose (product, store) was re-added in the meantime is merged
    /// into the existing line.
    pub fn restore_lines(&mut self, lines: Vec<CartLine>) {
        for line in lines {
            match self
                .lines
                .iter_mut()
                .find(|l| l.product_id == line.product_id && l.store_id == line.store_id)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => self.lines.push(line),
            }
        }
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Number of units across all lines.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Store of the first line; a purchase is attributed to it.
    pub fn first_store(&self) -> Option<StoreId> {
        self.lines.first().map(|l| l.store_id)
    }
}

impl Entity for Cart {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.customer_id
    }
}
