use storeledger_auth::{CommandAuthorization, Permission};
use storeledger_catalog::{CustomerId, SupplierId};
use storeledger_core::AggregateId;

use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CmdAuth<C> {
    pub fn new(inner: C, required: Vec<Permission>) -> Self {
        Self { inner, required }
    }
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Guard a route that carries no command payload.
pub fn require(principal: &PrincipalContext, permission: Permission) -> Result<(), axum::response::Response> {
    authz::authorize_command(principal, &CmdAuth::new((), vec![permission])).map_err(errors::forbidden)
}

pub fn parse_id(raw: &str, what: &str) -> Result<AggregateId, axum::response::Response> {
    raw.parse().map_err(|_| errors::invalid_id(what))
}

/// The customer profile of the calling user.
pub fn current_customer(services: &AppServices, principal: &PrincipalContext) -> Result<CustomerId, axum::response::Response> {
    services
        .services()
        .catalog
        .customer_for_user(principal.user_id())
        .map(|c| c.id_typed())
        .ok_or_else(|| {
            errors::json_error(
                axum::http::StatusCode::NOT_FOUND,
                "not_found",
                "no customer profile for this user",
            )
        })
}

/// The supplier profile of the calling user, if any.
pub fn current_supplier(services: &AppServices, principal: &PrincipalContext) -> Option<SupplierId> {
    services
        .services()
        .catalog
        .supplier_for_user(principal.user_id())
        .map(|s| s.id_typed())
}

pub fn ok_json(status: axum::http::StatusCode, body: serde_json::Value) -> ApiResult {
    use axum::response::IntoResponse;
    Ok((status, axum::Json(body)).into_response())
}
