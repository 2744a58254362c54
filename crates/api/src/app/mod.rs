//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: ledger backend, event bus, realtime fan-out
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use storeledger_infra::{AppConfig, LedgerError};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router from process configuration.
pub async fn build_app(config: &AppConfig) -> Result<Router, LedgerError> {
    let services = AppServices::from_config(config).await?;
    Ok(router_with(Arc::new(services), config.jwt_secret.clone()))
}

/// Build the router over already-wired services.
pub fn router_with(services: Arc<AppServices>, jwt_secret: String) -> Router {
    let jwt = Arc::new(storeledger_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
