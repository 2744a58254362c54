use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use storeledger_auth::Permission;
use storeledger_purchasing::DeliveryId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{current_supplier, ok_json, parse_id, require};
use crate::app::services::AppServices;
use crate::authz::principal_of;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_deliveries).post(register_delivery))
        .route("/pending", get(list_pending))
        .route("/:id/approve", post(approve_delivery))
}

fn no_supplier_profile() -> axum::response::Response {
    errors::json_error(
        StatusCode::NOT_FOUND,
        "not_found",
        "no supplier profile for this user",
    )
}

pub async fn register_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RegisterDeliveryRequest>,
) -> ApiResult {
    require(&principal, Permission::DELIVERIES_MANAGE_SUPPLIER)?;

    let supplier_id = if principal_of(&principal).is_admin() {
        body.supplier_id.ok_or_else(|| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "supplier_id is required",
            )
        })?
    } else {
        let own = current_supplier(&services, &principal).ok_or_else(no_supplier_profile)?;
        if body.supplier_id.is_some_and(|s| s != own) {
            return Err(errors::json_error(
                StatusCode::FORBIDDEN,
                "forbidden",
                "suppliers can only register their own deliveries",
            ));
        }
        own
    };

    let delivery = services
        .services()
        .deliveries
        .register(supplier_id, body.store_id, body.product_id, body.quantity)
        .map_err(errors::service_error_to_response)?;

    ok_json(StatusCode::CREATED, dto::delivery_to_json(&delivery))
}

/// Admins see every delivery; suppliers see their own, newest first.
pub async fn list_deliveries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, Permission::DELIVERIES_MANAGE)?;

    let deliveries = if principal_of(&principal).is_admin() {
        services.services().deliveries.list_all()
    } else {
        let own = current_supplier(&services, &principal).ok_or_else(no_supplier_profile)?;
        services.services().deliveries.list_for_supplier(own)
    };

    let items = deliveries.iter().map(dto::delivery_to_json).collect::<Vec<_>>();
    ok_json(StatusCode::OK, serde_json::json!({ "items": items }))
}

pub async fn list_pending(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, Permission::DELIVERIES_APPROVE)?;
    let items = services
        .services()
        .deliveries
        .list_pending()
        .iter()
        .map(dto::delivery_to_json)
        .collect::<Vec<_>>();
    ok_json(StatusCode::OK, serde_json::json!({ "items": items }))
}

/// Approving twice is a no-op: `applied` is false and no movement is recorded.
pub async fn approve_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, Permission::DELIVERIES_APPROVE)?;
    let delivery_id = DeliveryId::new(parse_id(&id, "delivery")?);

    let outcome = services
        .services()
        .deliveries
        .approve(delivery_id)
        .await
        .map_err(errors::service_error_to_response)?;

    ok_json(
        StatusCode::OK,
        serde_json::json!({
            "delivery": dto::delivery_to_json(&outcome.delivery),
            "applied": outcome.movement.is_some(),
            "movement": outcome.movement.as_ref().map(dto::movement_to_json),
        }),
    )
}
