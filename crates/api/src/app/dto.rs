use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use storeledger_catalog::{
    Customer, Product, ProductId, Store, StoreId, Supplier, SupplierId, SupplierStoreRelation,
};
use storeledger_core::{Money, UserId};
use storeledger_infra::MovementFilter;
use storeledger_infra::services::{CartView, Receipt, StoreProduct};
use storeledger_inventory::{MovementDirection, StockEntry, StockMovement};
use storeledger_purchasing::SupplierDelivery;
use storeledger_sales::{CartLine, Purchase};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub street: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Price in cents.
    pub price: u64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterCustomerRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub tax_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterSupplierRequest {
    /// Admins may register a supplier for another user (or none).
    pub user_id: Option<UserId>,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub street: Option<String>,
    pub tax_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkStoreRequest {
    pub store_id: StoreId,
    pub start_date: NaiveDate,
    pub contract_terms: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: ProductId,
    pub store_id: StoreId,
}

#[derive(Debug, Deserialize)]
pub struct RegisterDeliveryRequest {
    /// Required for admins; suppliers always deliver as themselves.
    pub supplier_id: Option<SupplierId>,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: u64,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub from_store: StoreId,
    pub to_store: StoreId,
    pub amount: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    pub product_id: Option<ProductId>,
    pub store_id: Option<StoreId>,
    pub direction: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl MovementQuery {
    pub fn into_filter(self) -> Result<MovementFilter, axum::response::Response> {
        let direction = match self.direction.as_deref() {
            None => None,
            Some(raw) => Some(MovementDirection::parse(raw).ok_or_else(|| {
                errors::json_error(
                    axum::http::StatusCode::BAD_REQUEST,
                    "invalid_direction",
                    "direction must be one of: IN, OUT",
                )
            })?),
        };
        Ok(MovementFilter {
            product_id: self.product_id,
            store_id: self.store_id,
            direction,
            since: self.since,
            limit: self.limit,
        })
    }
}

// -------------------------
// Response mapping
// -------------------------

fn money_to_json(m: Money) -> JsonValue {
    json!({ "cents": m.cents(), "display": m.to_string() })
}

pub fn store_to_json(s: &Store) -> JsonValue {
    json!({
        "id": s.id_typed().to_string(),
        "name": s.name(),
        "street": s.street(),
        "phone": s.phone(),
    })
}

pub fn product_to_json(p: &Product) -> JsonValue {
    json!({
        "id": p.id_typed().to_string(),
        "name": p.name(),
        "description": p.description(),
        "price": money_to_json(p.price()),
    })
}

pub fn store_product_to_json(sp: &StoreProduct) -> JsonValue {
    json!({
        "product": product_to_json(&sp.product),
        "quantity": sp.quantity,
    })
}

pub fn customer_to_json(c: &Customer) -> JsonValue {
    json!({
        "id": c.id_typed().to_string(),
        "user_id": c.user_id().to_string(),
        "name": c.name(),
        "email": c.email(),
        "phone": c.phone(),
        "street": c.street(),
        "tax_id": c.tax_id(),
        "registered_at": c.registered_at().to_rfc3339(),
    })
}

pub fn supplier_to_json(s: &Supplier) -> JsonValue {
    json!({
        "id": s.id_typed().to_string(),
        "user_id": s.user_id().map(|u| u.to_string()),
        "name": s.name(),
        "contact_person": s.contact_person(),
        "phone": s.phone(),
        "email": s.email(),
        "street": s.street(),
        "tax_id": s.tax_id(),
    })
}

pub fn relation_to_json(r: &SupplierStoreRelation) -> JsonValue {
    json!({
        "supplier_id": r.supplier_id.to_string(),
        "store_id": r.store_id.to_string(),
        "start_date": r.start_date.to_string(),
        "contract_terms": r.contract_terms,
    })
}

fn cart_line_to_json(l: &CartLine) -> JsonValue {
    json!({
        "id": l.id.to_string(),
        "product_id": l.product_id.to_string(),
        "store_id": l.store_id.to_string(),
        "quantity": l.quantity,
        "unit_price": money_to_json(l.unit_price),
        "line_total": money_to_json(l.line_total()),
    })
}

pub fn cart_to_json(v: &CartView) -> JsonValue {
    json!({
        "customer_id": v.customer_id.to_string(),
        "store_id": v.store_id.map(|s| s.to_string()),
        "item_count": v.item_count,
        "total": money_to_json(v.total),
        "lines": v.lines.iter().map(cart_line_to_json).collect::<Vec<_>>(),
    })
}

pub fn purchase_to_json(p: &Purchase) -> JsonValue {
    json!({
        "id": p.id_typed().to_string(),
        "customer_id": p.customer_id().to_string(),
        "store_id": p.store_id().to_string(),
        "purchased_at": p.purchased_at().to_rfc3339(),
        "total": money_to_json(p.total_amount()),
        "details": p.details().iter().map(|d| json!({
            "product_id": d.product_id.to_string(),
            "quantity": d.quantity,
            "unit_price": money_to_json(d.unit_price),
            "total_price": money_to_json(d.total_price()),
        })).collect::<Vec<_>>(),
    })
}

pub fn receipt_to_json(r: &Receipt) -> JsonValue {
    json!({
        "purchase": r.purchase.as_ref().map(purchase_to_json),
        "skipped": r.skipped.iter().map(|s| json!({
            "line": cart_line_to_json(&s.line),
            "available": s.available,
        })).collect::<Vec<_>>(),
    })
}

pub fn delivery_to_json(d: &SupplierDelivery) -> JsonValue {
    json!({
        "id": d.id_typed().to_string(),
        "supplier_id": d.supplier_id().map(|s| s.to_string()),
        "store_id": d.store_id().map(|s| s.to_string()),
        "product_id": d.product_id().map(|p| p.to_string()),
        "quantity": d.quantity(),
        "delivered_at": d.delivered_at().map(|t| t.to_rfc3339()),
        "approved": d.is_approved(),
        "approved_at": d.approved_at().map(|t| t.to_rfc3339()),
    })
}

pub fn entry_to_json(e: &StockEntry) -> JsonValue {
    json!({
        "product_id": e.product_id().to_string(),
        "store_id": e.store_id().to_string(),
        "quantity": e.quantity(),
    })
}

pub fn movement_to_json(m: &StockMovement) -> JsonValue {
    json!({
        "movement_id": m.movement_id.to_string(),
        "product_id": m.product_id.to_string(),
        "store_id": m.store_id.to_string(),
        "quantity": m.quantity,
        "direction": m.direction.as_str(),
        "occurred_at": m.occurred_at.to_rfc3339(),
    })
}
