//! The persistence boundary consumed by the HTTP layer.
//!
//! Implementations own atomicity: every method is one bounded transactional
//! unit, and [`Store::attach_material`] in particular must keep its
//! check-then-act sequence (work order exists → not finished → material
//! exists → insert) from interleaving with a concurrent status update.

use async_trait::async_trait;

use oficina_catalog::Material;
use oficina_core::{MaterialId, WorkOrderId};
use oficina_workorders::{WorkOrder, WorkOrderView};

use crate::error::StoreResult;
use crate::query::{MaterialQuery, WorkOrderQuery};

#[async_trait]
pub trait Store: Send + Sync {
    // -------------------------
    // Catalog
    // -------------------------

    /// Insert a new material. Fails with `Conflict` when the name (exact
    /// match) already exists.
    async fn insert_material(&self, material: Material) -> StoreResult<Material>;

    /// Insert a batch, skipping items whose name already exists — in the
    /// catalog or earlier in the batch. Returns what was actually inserted.
    async fn insert_materials_bulk(&self, materials: Vec<Material>) -> StoreResult<Vec<Material>>;

    /// Fetch one material or fail with `NotFound("material")`.
    async fn material(&self, id: MaterialId) -> StoreResult<Material>;

    /// Unique-key lookup by exact name.
    async fn material_by_name(&self, name: &str) -> StoreResult<Option<Material>>;

    /// List the catalog per the query.
    async fn list_materials(&self, query: MaterialQuery) -> StoreResult<Vec<Material>>;

    /// Full replace of name and unit price. `NotFound` when absent,
    /// `Conflict` when the new name collides with another material.
    async fn update_material(
        &self,
        id: MaterialId,
        name: String,
        unit_price: f64,
    ) -> StoreResult<Material>;

    /// Delete a material. Refused with `Conflict` while consumption entries
    /// still reference it.
    async fn delete_material(&self, id: MaterialId) -> StoreResult<()>;

    // -------------------------
    // Work orders
    // -------------------------

    /// Insert a new work order; the returned view carries an empty ledger.
    async fn insert_work_order(&self, work_order: WorkOrder) -> StoreResult<WorkOrderView>;

    /// Fetch one work order with its costed ledger, or
    /// `NotFound("work order")`.
    async fn work_order_view(&self, id: WorkOrderId) -> StoreResult<WorkOrderView>;

    /// List work orders (each with its costed ledger) per the query.
    async fn list_work_orders(&self, query: WorkOrderQuery) -> StoreResult<Vec<WorkOrderView>>;

    /// Full replace of summary and status; no transition guard.
    async fn update_work_order(
        &self,
        id: WorkOrderId,
        summary: String,
        status: String,
    ) -> StoreResult<WorkOrderView>;

    /// Delete a work order and, cascading, its consumption entries.
    async fn delete_work_order(&self, id: WorkOrderId) -> StoreResult<()>;

    // -------------------------
    // The consumption guard
    // -------------------------

    /// Attach a material to a work order, atomically running the guard:
    /// positive quantity (pre-checked by the boundary, re-checked here),
    /// work order exists and is not finished, material exists. Returns the
    /// refreshed view.
    async fn attach_material(
        &self,
        work_order_id: WorkOrderId,
        material_id: MaterialId,
        quantity: f64,
    ) -> StoreResult<WorkOrderView>;
}
