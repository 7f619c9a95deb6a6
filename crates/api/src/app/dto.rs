//! Request/response DTOs and JSON mapping helpers.
//!
//! External field names keep the historical camelCase Portuguese convention
//! (`nome`, `precoUnitario`, `quantidade`, ...); the rename to the internal
//! English names is mechanical and happens only here.

use serde::Deserialize;
use serde_json::{Value, json};

use oficina_catalog::Material;
use oficina_workorders::{CostSummary, WorkOrderView};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequest {
    pub nome: String,
    pub preco_unitario: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrderRequest {
    pub resumo: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkOrderRequest {
    pub resumo: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachMaterialRequest {
    pub material_id: String,
    pub quantidade: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialListParams {
    pub nome: Option<String>,
    pub ordenar_por: Option<String>,
    pub ordem: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WorkOrderListParams {
    pub status: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn material_json(material: &Material) -> Value {
    json!({
        "id": material.id_typed().to_string(),
        "nome": material.name(),
        "precoUnitario": material.unit_price(),
        "createdAt": material.created_at(),
    })
}

pub fn work_order_view_json(view: &WorkOrderView) -> Value {
    json!({
        "id": view.work_order.id_typed().to_string(),
        "resumo": view.work_order.summary(),
        "status": view.work_order.status_raw(),
        "createdAt": view.work_order.created_at(),
        "materiais": lines_json(&view.costs),
        "custoTotalMateriais": view.costs.total,
    })
}

fn lines_json(costs: &CostSummary) -> Vec<Value> {
    costs
        .lines
        .iter()
        .map(|line| {
            json!({
                "materialId": line.material_id.to_string(),
                "nome": line.name,
                "quantidade": line.quantity,
                "precoUnitario": line.unit_price,
                "custo": line.cost,
            })
        })
        .collect()
}
