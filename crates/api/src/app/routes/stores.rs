use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};

use storeledger_auth::Permission;
use storeledger_catalog::{NewStore, StoreId};

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{ok_json, parse_id, require};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stores).post(create_store))
        .route("/:id/products", get(store_products))
        .route("/:id/stock", get(store_stock))
}

pub async fn create_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateStoreRequest>,
) -> ApiResult {
    require(&principal, Permission::STORES_MANAGE)?;

    let store = services
        .services()
        .catalog
        .register_store(NewStore {
            name: body.name,
            street: body.street,
            phone: body.phone,
        })
        .map_err(errors::service_error_to_response)?;

    ok_json(StatusCode::CREATED, dto::store_to_json(&store))
}

pub async fn list_stores(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let items = services
        .services()
        .catalog
        .list_stores()
        .iter()
        .map(dto::store_to_json)
        .collect::<Vec<_>>();
    ok_json(StatusCode::OK, serde_json::json!({ "items": items }))
}

/// Products currently in stock at the store.
pub async fn store_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let store_id = StoreId::new(parse_id(&id, "store")?);
    let items = services
        .services()
        .catalog
        .store_products(store_id)
        .await
        .map_err(errors::service_error_to_response)?;

    ok_json(
        StatusCode::OK,
        serde_json::json!({
            "store_id": store_id.to_string(),
            "items": items.iter().map(dto::store_product_to_json).collect::<Vec<_>>(),
        }),
    )
}

pub async fn store_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, Permission::STOCK_VIEW)?;
    let store_id = StoreId::new(parse_id(&id, "store")?);

    let entries = services
        .services()
        .stock
        .entries_for_store(store_id)
        .await
        .map_err(errors::service_error_to_response)?;

    ok_json(
        StatusCode::OK,
        serde_json::json!({
            "store_id": store_id.to_string(),
            "items": entries.iter().map(dto::entry_to_json).collect::<Vec<_>>(),
        }),
    )
}
