//! Consistent JSON error responses.
//!
//! The store surfaces four programmatically distinguishable failure kinds;
//! each gets its own status code instead of the flat 400 a naive mapping
//! would produce:
//!
//! | Failure | Status | `error` code |
//! |---------|--------|--------------|
//! | invalid input / malformed id | 400 | `invalid_input` |
//! | unknown work order / material | 404 | `not_found` |
//! | duplicate name, referenced material | 409 | `conflict` |
//! | finished work order (guard) | 422 | `invalid_state` |
//! | backend failure | 500 | `store_error` |

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use oficina_core::DomainError;
use oficina_store::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Domain(domain) => domain_error_to_response(domain),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "storage backend failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "storage backend failure",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        DomainError::NotFound(subject) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{subject} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InvalidState(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
