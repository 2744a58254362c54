use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};

use storeledger_auth::Permission;
use storeledger_catalog::{NewProduct, ProductId};
use storeledger_core::Money;

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{ok_json, parse_id, require};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> ApiResult {
    require(&principal, Permission::PRODUCTS_MANAGE)?;

    let product = services
        .services()
        .catalog
        .register_product(NewProduct {
            name: body.name,
            description: body.description,
            price: Money::from_cents(body.price),
        })
        .map_err(errors::service_error_to_response)?;

    ok_json(StatusCode::CREATED, dto::product_to_json(&product))
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let items = services
        .services()
        .catalog
        .list_products()
        .iter()
        .map(dto::product_to_json)
        .collect::<Vec<_>>();
    ok_json(StatusCode::OK, serde_json::json!({ "items": items }))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let product_id = ProductId::new(parse_id(&id, "product")?);
    let product = services
        .services()
        .catalog
        .product(product_id)
        .map_err(errors::service_error_to_response)?;
    ok_json(StatusCode::OK, dto::product_to_json(&product))
}
