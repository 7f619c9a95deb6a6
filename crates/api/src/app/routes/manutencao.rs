use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use oficina_core::{MaterialId, WorkOrderId};
use oficina_store::{Store, WorkOrderQuery};
use oficina_workorders::WorkOrder;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_work_order).get(list_work_orders))
        .route(
            "/:id",
            get(get_work_order)
                .put(update_work_order)
                .delete(delete_work_order),
        )
        .route("/:id/materiais", post(attach_material))
}

pub async fn create_work_order(
    Extension(store): Extension<Arc<dyn Store>>,
    Json(body): Json<dto::CreateWorkOrderRequest>,
) -> axum::response::Response {
    let work_order = match WorkOrder::new(WorkOrderId::new(), body.resumo, body.status, Utc::now())
    {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store.insert_work_order(work_order).await {
        Ok(view) => {
            (StatusCode::CREATED, Json(dto::work_order_view_json(&view))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_work_orders(
    Extension(store): Extension<Arc<dyn Store>>,
    Query(params): Query<dto::WorkOrderListParams>,
) -> axum::response::Response {
    let query = WorkOrderQuery {
        status: params.status,
        offset: params.offset.unwrap_or(0),
        limit: params.limit,
    };
    match store.list_work_orders(query).await {
        Ok(views) => {
            let body: Vec<_> = views.iter().map(dto::work_order_view_json).collect();
            Json(body).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_work_order(
    Extension(store): Extension<Arc<dyn Store>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: WorkOrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store.work_order_view(id).await {
        Ok(view) => Json(dto::work_order_view_json(&view)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_work_order(
    Extension(store): Extension<Arc<dyn Store>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateWorkOrderRequest>,
) -> axum::response::Response {
    let id: WorkOrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store.update_work_order(id, body.resumo, body.status).await {
        Ok(view) => Json(dto::work_order_view_json(&view)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_work_order(
    Extension(store): Extension<Arc<dyn Store>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: WorkOrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store.delete_work_order(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn attach_material(
    Extension(store): Extension<Arc<dyn Store>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AttachMaterialRequest>,
) -> axum::response::Response {
    let work_order_id: WorkOrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let material_id: MaterialId = match body.material_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store
        .attach_material(work_order_id, material_id, body.quantidade)
        .await
    {
        Ok(view) => Json(dto::work_order_view_json(&view)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
