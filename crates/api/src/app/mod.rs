//! HTTP application wiring (Axum router + store wiring).
//!
//! This folder is structured like:
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use oficina_store::Store;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router over any store (public entrypoint used by
/// `main.rs` and the black-box tests).
pub fn build_app(store: Arc<dyn Store>) -> Router {
    Router::new()
        .route("/", get(routes::system::health))
        .nest("/materiais", routes::materiais::router())
        .nest("/manutencao", routes::manutencao::router())
        .layer(ServiceBuilder::new().layer(Extension(store)))
}
