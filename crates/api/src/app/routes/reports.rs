use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};

use storeledger_auth::Permission;
use storeledger_catalog::{StoreId, SupplierId};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{current_supplier, ok_json, parse_id, require};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/deliveries", get(delivery_report))
        .route("/stores/:id", get(store_report))
        .route("/suppliers/:id", get(supplier_report))
}

/// Top store/product pairs by approved delivered quantity.
pub async fn delivery_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, Permission::REPORTS_VIEW)?;
    let rows = services
        .services()
        .reports
        .delivery_report()
        .map_err(errors::service_error_to_response)?;
    ok_json(StatusCode::OK, serde_json::json!({ "items": rows }))
}

pub async fn store_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, Permission::REPORTS_VIEW)?;
    let store_id = StoreId::new(parse_id(&id, "store")?);
    let total = services
        .services()
        .reports
        .store_total_stock(store_id)
        .await
        .map_err(errors::service_error_to_response)?;
    ok_json(
        StatusCode::OK,
        serde_json::json!({ "store_id": store_id.to_string(), "total_stock": total }),
    )
}

/// Admins, or the supplier itself.
pub async fn supplier_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let supplier_id = SupplierId::new(parse_id(&id, "supplier")?);
    if current_supplier(&services, &principal) != Some(supplier_id) {
        require(&principal, Permission::REPORTS_VIEW)?;
    }

    let total = services
        .services()
        .reports
        .supplier_total_deliveries(supplier_id)
        .map_err(errors::service_error_to_response)?;
    ok_json(
        StatusCode::OK,
        serde_json::json!({ "supplier_id": supplier_id.to_string(), "total_delivered": total }),
    )
}
