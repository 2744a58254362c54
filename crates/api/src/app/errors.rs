use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use storeledger_auth::AuthzError;
use storeledger_core::DomainError;
use storeledger_infra::{LedgerError, ServiceError};

pub type ApiResult = Result<Response, Response>;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Ledger(LedgerError::Domain(e)) => domain_error_to_response(e),
        ServiceError::Ledger(LedgerError::Store(msg)) => {
            error!(error = %msg, "stock ledger store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
        ServiceError::NotFound(kind) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{kind} not found"))
        }
        ServiceError::CartEmpty => json_error(StatusCode::BAD_REQUEST, "cart_empty", "cart is empty"),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvariantViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", message)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", message),
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", message)
        }
    }
}

pub fn forbidden(err: AuthzError) -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn invalid_id(what: &str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (ServiceError::Domain(DomainError::validation("x")), StatusCode::BAD_REQUEST),
            (
                ServiceError::Domain(DomainError::insufficient_stock(3, 2)),
                StatusCode::CONFLICT,
            ),
            (ServiceError::NotFound("store"), StatusCode::NOT_FOUND),
            (ServiceError::CartEmpty, StatusCode::BAD_REQUEST),
            (
                ServiceError::Ledger(LedgerError::Store("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
