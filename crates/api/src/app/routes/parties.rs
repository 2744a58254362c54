//! Customer and supplier profiles, supplier↔store links.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use storeledger_auth::Permission;
use storeledger_catalog::{NewCustomer, NewSupplier, SupplierId};

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{current_customer, ok_json, parse_id, require};
use crate::app::services::AppServices;
use crate::authz::principal_of;
use crate::context::PrincipalContext;

pub fn customers_router() -> Router {
    Router::new()
        .route("/", post(register_customer))
        .route("/me", get(my_customer_profile))
}

pub fn suppliers_router() -> Router {
    Router::new()
        .route("/", post(register_supplier).get(list_suppliers))
        .route("/:id/stores", post(link_store).get(linked_stores))
}

/// Register the caller's own customer profile.
pub async fn register_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RegisterCustomerRequest>,
) -> ApiResult {
    let customer = services
        .services()
        .catalog
        .register_customer(NewCustomer {
            user_id: principal.user_id(),
            name: body.name,
            email: body.email,
            phone: body.phone,
            street: body.street,
            tax_id: body.tax_id,
        })
        .map_err(errors::service_error_to_response)?;

    ok_json(StatusCode::CREATED, dto::customer_to_json(&customer))
}

pub async fn my_customer_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let id = current_customer(&services, &principal)?;
    let customer = services
        .services()
        .catalog
        .customer(id)
        .map_err(errors::service_error_to_response)?;
    ok_json(StatusCode::OK, dto::customer_to_json(&customer))
}

/// Suppliers register themselves; admins may register on behalf of any user.
pub async fn register_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RegisterSupplierRequest>,
) -> ApiResult {
    require(&principal, Permission::DELIVERIES_MANAGE_SUPPLIER)?;

    let user_id = if principal_of(&principal).is_admin() {
        body.user_id
    } else {
        Some(principal.user_id())
    };

    let supplier = services
        .services()
        .catalog
        .register_supplier(NewSupplier {
            user_id,
            name: body.name,
            contact_person: body.contact_person,
            phone: body.phone,
            email: body.email,
            street: body.street,
            tax_id: body.tax_id,
        })
        .map_err(errors::service_error_to_response)?;

    ok_json(StatusCode::CREATED, dto::supplier_to_json(&supplier))
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, Permission::STORES_MANAGE)?;
    let items = services
        .services()
        .catalog
        .list_suppliers()
        .iter()
        .map(dto::supplier_to_json)
        .collect::<Vec<_>>();
    ok_json(StatusCode::OK, serde_json::json!({ "items": items }))
}

pub async fn link_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::LinkStoreRequest>,
) -> ApiResult {
    require(&principal, Permission::STORES_MANAGE)?;
    let supplier_id = SupplierId::new(parse_id(&id, "supplier")?);

    let relation = services
        .services()
        .catalog
        .link_supplier_store(supplier_id, body.store_id, body.start_date, body.contract_terms)
        .map_err(errors::service_error_to_response)?;

    ok_json(StatusCode::CREATED, dto::relation_to_json(&relation))
}

pub async fn linked_stores(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let supplier_id = SupplierId::new(parse_id(&id, "supplier")?);
    services
        .services()
        .catalog
        .supplier(supplier_id)
        .map_err(errors::service_error_to_response)?;

    let items = services
        .services()
        .catalog
        .stores_of_supplier(supplier_id)
        .iter()
        .map(dto::relation_to_json)
        .collect::<Vec<_>>();
    ok_json(StatusCode::OK, serde_json::json!({ "items": items }))
}
