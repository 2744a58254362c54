use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    routing::{get, post},
};
use tracing::warn;

use storeledger_auth::Permission;
use storeledger_inventory::TransferOutcome;

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{ok_json, require};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(stock_dashboard))
        .route("/movements", get(list_movements))
        .route("/transfers", post(transfer_stock))
}

/// Every stock entry across all stores.
pub async fn stock_dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, Permission::STOCK_VIEW)?;
    let entries = services
        .services()
        .stock
        .entries()
        .await
        .map_err(errors::service_error_to_response)?;
    ok_json(
        StatusCode::OK,
        serde_json::json!({ "items": entries.iter().map(dto::entry_to_json).collect::<Vec<_>>() }),
    )
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::MovementQuery>,
) -> ApiResult {
    require(&principal, Permission::STOCK_VIEW)?;
    let filter = query.into_filter()?;
    let movements = services
        .services()
        .stock
        .movements(&filter)
        .await
        .map_err(errors::service_error_to_response)?;
    ok_json(
        StatusCode::OK,
        serde_json::json!({ "items": movements.iter().map(dto::movement_to_json).collect::<Vec<_>>() }),
    )
}

/// A short source is reported as `rejected` with 409, nothing is moved.
pub async fn transfer_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::TransferRequest>,
) -> ApiResult {
    require(&principal, Permission::STOCK_TRANSFER)?;

    let outcome = services
        .services()
        .stock
        .transfer(body.product_id, body.from_store, body.to_store, body.amount)
        .await
        .map_err(errors::service_error_to_response)?;

    match &outcome {
        TransferOutcome::Completed { outbound, inbound } => ok_json(
            StatusCode::OK,
            serde_json::json!({
                "status": "completed",
                "outbound": dto::movement_to_json(outbound),
                "inbound": dto::movement_to_json(inbound),
            }),
        ),
        TransferOutcome::Rejected { requested, available } => {
            warn!(requested, available, "transfer rejected");
            ok_json(
                StatusCode::CONFLICT,
                serde_json::json!({
                    "status": "rejected",
                    "requested": requested,
                    "available": available,
                }),
            )
        }
    }
}
