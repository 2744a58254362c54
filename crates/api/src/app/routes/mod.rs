use axum::{Router, routing::get};

pub mod cart;
pub mod common;
pub mod deliveries;
pub mod parties;
pub mod products;
pub mod reports;
pub mod stock;
pub mod stores;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .route("/purchases", get(cart::list_purchases))
        .nest("/stores", stores::router())
        .nest("/products", products::router())
        .nest("/customers", parties::customers_router())
        .nest("/suppliers", parties::suppliers_router())
        .nest("/cart", cart::router())
        .nest("/deliveries", deliveries::router())
        .nest("/stock", stock::router())
        .nest("/reports", reports::router())
}
