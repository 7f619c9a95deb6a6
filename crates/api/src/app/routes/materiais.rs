use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use oficina_catalog::Material;
use oficina_core::MaterialId;
use oficina_store::{MaterialQuery, MaterialSortField, SortDir, Store};

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_material).get(list_materials))
        .route("/bulk", post(create_materials_bulk))
        .route(
            "/:id",
            get(get_material).put(update_material).delete(delete_material),
        )
}

pub async fn create_material(
    Extension(store): Extension<Arc<dyn Store>>,
    Json(body): Json<dto::MaterialRequest>,
) -> axum::response::Response {
    let material = match Material::new(MaterialId::new(), body.nome, body.preco_unitario, Utc::now())
    {
        Ok(m) => m,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store.insert_material(material).await {
        Ok(created) => (StatusCode::CREATED, Json(dto::material_json(&created))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_materials_bulk(
    Extension(store): Extension<Arc<dyn Store>>,
    Json(body): Json<Vec<dto::MaterialRequest>>,
) -> axum::response::Response {
    let mut materials = Vec::with_capacity(body.len());
    for item in body {
        match Material::new(MaterialId::new(), item.nome, item.preco_unitario, Utc::now()) {
            Ok(m) => materials.push(m),
            Err(e) => return errors::domain_error_to_response(e),
        }
    }
    match store.insert_materials_bulk(materials).await {
        Ok(inserted) => {
            let body: Vec<_> = inserted.iter().map(dto::material_json).collect();
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_materials(
    Extension(store): Extension<Arc<dyn Store>>,
    Query(params): Query<dto::MaterialListParams>,
) -> axum::response::Response {
    let sort_by = match parse_sort_field(params.ordenar_por.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let sort_dir = match parse_sort_dir(params.ordem.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let query = MaterialQuery {
        name_contains: params.nome,
        sort_by,
        sort_dir,
        offset: params.offset.unwrap_or(0),
        limit: params.limit,
    };
    match store.list_materials(query).await {
        Ok(materials) => {
            let body: Vec<_> = materials.iter().map(dto::material_json).collect();
            Json(body).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_material(
    Extension(store): Extension<Arc<dyn Store>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MaterialId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store.material(id).await {
        Ok(material) => Json(dto::material_json(&material)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_material(
    Extension(store): Extension<Arc<dyn Store>>,
    Path(id): Path<String>,
    Json(body): Json<dto::MaterialRequest>,
) -> axum::response::Response {
    let id: MaterialId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store.update_material(id, body.nome, body.preco_unitario).await {
        Ok(updated) => Json(dto::material_json(&updated)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_material(
    Extension(store): Extension<Arc<dyn Store>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MaterialId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match store.delete_material(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

fn parse_sort_field(s: Option<&str>) -> Result<MaterialSortField, axum::response::Response> {
    match s {
        None | Some("nome") => Ok(MaterialSortField::Name),
        Some("precoUnitario") => Ok(MaterialSortField::UnitPrice),
        Some(other) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            format!("ordenarPor must be 'nome' or 'precoUnitario', got '{other}'"),
        )),
    }
}

fn parse_sort_dir(s: Option<&str>) -> Result<SortDir, axum::response::Response> {
    match s {
        None | Some("asc") => Ok(SortDir::Asc),
        Some("desc") => Ok(SortDir::Desc),
        Some(other) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            format!("ordem must be 'asc' or 'desc', got '{other}'"),
        )),
    }
}
