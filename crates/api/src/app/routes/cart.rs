use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get, post},
};

use storeledger_auth::Permission;
use storeledger_sales::CartLineId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{current_customer, ok_json, parse_id, require};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(view_cart))
        .route("/items", post(add_item))
        .route("/items/:id", delete(remove_item))
        .route("/checkout", post(checkout))
}

pub async fn view_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let customer_id = current_customer(&services, &principal)?;
    let view = services.services().carts.view_cart(customer_id);
    ok_json(StatusCode::OK, dto::cart_to_json(&view))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::AddCartItemRequest>,
) -> ApiResult {
    let customer_id = current_customer(&services, &principal)?;
    let item_count = services
        .services()
        .carts
        .add_to_cart(customer_id, body.product_id, body.store_id)
        .map_err(errors::service_error_to_response)?;
    ok_json(StatusCode::OK, serde_json::json!({ "item_count": item_count }))
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let customer_id = current_customer(&services, &principal)?;
    let line_id = CartLineId::new(parse_id(&id, "cart line")?);
    let item_count = services
        .services()
        .carts
        .remove_from_cart(customer_id, line_id)
        .map_err(errors::service_error_to_response)?;
    ok_json(StatusCode::OK, serde_json::json!({ "item_count": item_count }))
}

/// Lines short on stock are skipped, not failed; see `skipped` in the body.
pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let customer_id = current_customer(&services, &principal)?;
    let receipt = services
        .services()
        .carts
        .checkout(customer_id)
        .await
        .map_err(errors::service_error_to_response)?;

    let status = if receipt.purchase.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    ok_json(status, dto::receipt_to_json(&receipt))
}

/// Purchase history of the caller, newest first.
pub async fn list_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, Permission::PURCHASES_VIEW_OWN)?;
    let customer_id = current_customer(&services, &principal)?;
    let purchases = services.services().carts.purchases_for(customer_id);
    ok_json(
        StatusCode::OK,
        serde_json::json!({
            "count": purchases.len(),
            "items": purchases.iter().map(dto::purchase_to_json).collect::<Vec<_>>(),
        }),
    )
}
