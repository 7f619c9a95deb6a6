//! In-memory store.
//!
//! Intended for dev and tests. One mutex guards the whole store, so every
//! operation — the attach guard's check-then-act included — runs as a single
//! atomic unit without further coordination.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use oficina_catalog::Material;
use oficina_core::{ConsumptionEntryId, DomainError, MaterialId, WorkOrderId};
use oficina_workorders::{ConsumptionEntry, WorkOrder, WorkOrderView, consumption, costing};

use crate::error::{StoreError, StoreResult};
use crate::query::{MaterialQuery, MaterialSortField, SortDir, WorkOrderQuery};
use crate::r#trait::Store;

#[derive(Debug, Default)]
struct Inner {
    materials: Vec<Material>,
    work_orders: Vec<WorkOrder>,
    entries: Vec<ConsumptionEntry>,
}

impl Inner {
    fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.iter().find(|m| m.id_typed() == id)
    }

    fn work_order(&self, id: WorkOrderId) -> Option<&WorkOrder> {
        self.work_orders.iter().find(|w| w.id_typed() == id)
    }

    /// Costed view of one work order; ledger lines in insertion order.
    fn view(&self, work_order: &WorkOrder) -> StoreResult<WorkOrderView> {
        let mut rows = Vec::new();
        for entry in self
            .entries
            .iter()
            .filter(|e| e.work_order_id() == work_order.id_typed())
        {
            let material = self.material(entry.material_id()).ok_or_else(|| {
                // Unreachable while the referential invariant holds.
                StoreError::backend("consumption entry references a missing material")
            })?;
            rows.push((entry, material));
        }
        Ok(WorkOrderView {
            work_order: work_order.clone(),
            costs: costing::summarize(rows),
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::backend("store lock poisoned"))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_material(&self, material: Material) -> StoreResult<Material> {
        let mut inner = self.lock()?;
        if inner.materials.iter().any(|m| m.name() == material.name()) {
            return Err(DomainError::conflict(format!(
                "a material named '{}' already exists",
                material.name()
            ))
            .into());
        }
        inner.materials.push(material.clone());
        Ok(material)
    }

    async fn insert_materials_bulk(&self, materials: Vec<Material>) -> StoreResult<Vec<Material>> {
        let mut inner = self.lock()?;
        let mut inserted = Vec::new();
        for material in materials {
            let duplicate = inner.materials.iter().any(|m| m.name() == material.name());
            if duplicate {
                tracing::debug!(name = material.name(), "bulk insert skipping duplicate");
                continue;
            }
            inner.materials.push(material.clone());
            inserted.push(material);
        }
        Ok(inserted)
    }

    async fn material(&self, id: MaterialId) -> StoreResult<Material> {
        let inner = self.lock()?;
        inner
            .material(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("material").into())
    }

    async fn material_by_name(&self, name: &str) -> StoreResult<Option<Material>> {
        let inner = self.lock()?;
        Ok(inner.materials.iter().find(|m| m.name() == name).cloned())
    }

    async fn list_materials(&self, query: MaterialQuery) -> StoreResult<Vec<Material>> {
        let inner = self.lock()?;
        let mut items: Vec<Material> = match &query.name_contains {
            Some(needle) => {
                let needle = needle.to_lowercase();
                inner
                    .materials
                    .iter()
                    .filter(|m| m.name().to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            }
            None => inner.materials.clone(),
        };

        items.sort_by(|a, b| {
            let ord = match query.sort_by {
                MaterialSortField::Name => a.name().cmp(b.name()),
                MaterialSortField::UnitPrice => a
                    .unit_price()
                    .partial_cmp(&b.unit_price())
                    .unwrap_or(std::cmp::Ordering::Equal),
            };
            match query.sort_dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            }
        });

        Ok(items
            .into_iter()
            .skip(query.offset as usize)
            .take(query.effective_limit() as usize)
            .collect())
    }

    async fn update_material(
        &self,
        id: MaterialId,
        name: String,
        unit_price: f64,
    ) -> StoreResult<Material> {
        let mut inner = self.lock()?;
        // Existence first: an unknown id is NotFound even when the new name
        // would collide.
        if inner.material(id).is_none() {
            return Err(DomainError::not_found("material").into());
        }
        let taken = name.trim();
        if inner
            .materials
            .iter()
            .any(|m| m.id_typed() != id && m.name() == taken)
        {
            return Err(
                DomainError::conflict(format!("a material named '{taken}' already exists")).into(),
            );
        }
        let material = inner
            .materials
            .iter_mut()
            .find(|m| m.id_typed() == id)
            .ok_or_else(|| DomainError::not_found("material"))?;
        material.replace(name, unit_price)?;
        Ok(material.clone())
    }

    async fn delete_material(&self, id: MaterialId) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.material(id).is_none() {
            return Err(DomainError::not_found("material").into());
        }
        if inner.entries.iter().any(|e| e.material_id() == id) {
            return Err(DomainError::conflict(
                "material is referenced by consumption entries",
            )
            .into());
        }
        inner.materials.retain(|m| m.id_typed() != id);
        Ok(())
    }

    async fn insert_work_order(&self, work_order: WorkOrder) -> StoreResult<WorkOrderView> {
        let mut inner = self.lock()?;
        inner.work_orders.push(work_order.clone());
        inner.view(&work_order)
    }

    async fn work_order_view(&self, id: WorkOrderId) -> StoreResult<WorkOrderView> {
        let inner = self.lock()?;
        let work_order = inner
            .work_order(id)
            .ok_or_else(|| DomainError::not_found("work order"))?;
        inner.view(work_order)
    }

    async fn list_work_orders(&self, query: WorkOrderQuery) -> StoreResult<Vec<WorkOrderView>> {
        let inner = self.lock()?;
        let mut views = Vec::new();
        for work_order in inner
            .work_orders
            .iter()
            .filter(|w| match &query.status {
                // Unicode fold: the status vocabulary is Portuguese and
                // carries accented letters.
                Some(wanted) => {
                    w.status_raw().to_lowercase() == wanted.trim().to_lowercase()
                }
                None => true,
            })
            .skip(query.offset as usize)
            .take(query.effective_limit() as usize)
        {
            views.push(inner.view(work_order)?);
        }
        Ok(views)
    }

    async fn update_work_order(
        &self,
        id: WorkOrderId,
        summary: String,
        status: String,
    ) -> StoreResult<WorkOrderView> {
        let mut inner = self.lock()?;
        let work_order = inner
            .work_orders
            .iter_mut()
            .find(|w| w.id_typed() == id)
            .ok_or_else(|| DomainError::not_found("work order"))?;
        work_order.replace(summary, status)?;
        let work_order = work_order.clone();
        inner.view(&work_order)
    }

    async fn delete_work_order(&self, id: WorkOrderId) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.work_order(id).is_none() {
            return Err(DomainError::not_found("work order").into());
        }
        inner.work_orders.retain(|w| w.id_typed() != id);
        // Cascade: the ledger is lifecycle-bound to its work order.
        inner.entries.retain(|e| e.work_order_id() != id);
        Ok(())
    }

    async fn attach_material(
        &self,
        work_order_id: WorkOrderId,
        material_id: MaterialId,
        quantity: f64,
    ) -> StoreResult<WorkOrderView> {
        // The whole guard runs under one lock acquisition; a concurrent
        // status update cannot interleave between check and insert.
        let mut inner = self.lock()?;

        consumption::validate_quantity(quantity)?;

        let work_order = inner
            .work_order(work_order_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("work order"))?;
        consumption::ensure_open(&work_order)?;

        let material = inner
            .material(material_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("material"))?;

        let entry = ConsumptionEntry::record(
            ConsumptionEntryId::new(),
            &work_order,
            material.id_typed(),
            quantity,
            chrono::Utc::now(),
        )?;
        tracing::debug!(
            work_order = %work_order_id,
            material = %material_id,
            quantity,
            "recorded material consumption"
        );
        inner.entries.push(entry);

        inner.view(&work_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn material(name: &str, unit_price: f64) -> Material {
        Material::new(MaterialId::new(), name, unit_price, Utc::now()).unwrap()
    }

    fn work_order(summary: &str, status: Option<&str>) -> WorkOrder {
        WorkOrder::new(
            WorkOrderId::new(),
            summary,
            status.map(|s| s.to_string()),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn attach_computes_line_and_total() {
        let store = InMemoryStore::new();
        let wo = store
            .insert_work_order(work_order("Reparar parede", Some("aberta")))
            .await
            .unwrap();
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();

        let view = store
            .attach_material(wo.work_order.id_typed(), cimento.id_typed(), 2.0)
            .await
            .unwrap();

        assert_eq!(view.costs.lines.len(), 1);
        assert_eq!(view.costs.lines[0].name, "Cimento");
        assert_eq!(view.costs.lines[0].cost, 100.0);
        assert_eq!(view.costs.total, 100.0);
    }

    #[tokio::test]
    async fn fresh_work_order_has_empty_ledger_and_zero_total() {
        let store = InMemoryStore::new();
        let view = store
            .insert_work_order(work_order("Reparar parede", None))
            .await
            .unwrap();
        assert!(view.costs.lines.is_empty());
        assert_eq!(view.costs.total, 0.0);
    }

    #[tokio::test]
    async fn attach_to_missing_work_order_is_not_found() {
        let store = InMemoryStore::new();
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();

        let err = store
            .attach_material(WorkOrderId::new(), cimento.id_typed(), 2.0)
            .await
            .unwrap_err();
        match err {
            StoreError::Domain(DomainError::NotFound(subject)) => {
                assert_eq!(subject, "work order")
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn attach_missing_material_is_not_found_even_on_finished_order() {
        let store = InMemoryStore::new();
        // Missing material on an *open* order.
        let open = store
            .insert_work_order(work_order("Reparar parede", Some("aberta")))
            .await
            .unwrap();
        let err = store
            .attach_material(open.work_order.id_typed(), MaterialId::new(), 2.0)
            .await
            .unwrap_err();
        match err {
            StoreError::Domain(DomainError::NotFound(subject)) => assert_eq!(subject, "material"),
            other => panic!("expected NotFound, got {other:?}"),
        }

        // On a finished order the state check fires first; the guard order is
        // work-order state before material existence.
        let finished = store
            .insert_work_order(work_order("Reparar parede", Some("finalizada")))
            .await
            .unwrap();
        let err = store
            .attach_material(finished.work_order.id_typed(), MaterialId::new(), 2.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn attach_rejects_finished_work_order_and_keeps_ledger_empty() {
        let store = InMemoryStore::new();
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();

        for status in ["finalizado", "finalizada", "fechada", "concluida", "concluída"] {
            let view = store
                .insert_work_order(work_order("Reparar parede", Some(status)))
                .await
                .unwrap();
            let err = store
                .attach_material(view.work_order.id_typed(), cimento.id_typed(), 2.0)
                .await
                .unwrap_err();
            match err {
                StoreError::Domain(DomainError::InvalidState(msg)) => {
                    assert!(msg.contains("finalizada"), "{status}: {msg}")
                }
                other => panic!("expected InvalidState for {status}, got {other:?}"),
            }
            let refreshed = store.work_order_view(view.work_order.id_typed()).await.unwrap();
            assert!(refreshed.costs.lines.is_empty());
        }
    }

    #[tokio::test]
    async fn attach_rejects_non_positive_quantity_without_creating_entries() {
        let store = InMemoryStore::new();
        let wo = store
            .insert_work_order(work_order("Reparar parede", None))
            .await
            .unwrap();
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();

        for quantity in [0.0, -5.0] {
            let err = store
                .attach_material(wo.work_order.id_typed(), cimento.id_typed(), quantity)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                StoreError::Domain(DomainError::InvalidInput(_))
            ));
        }
        let refreshed = store.work_order_view(wo.work_order.id_typed()).await.unwrap();
        assert!(refreshed.costs.lines.is_empty());
        assert_eq!(refreshed.costs.total, 0.0);
    }

    #[tokio::test]
    async fn two_attaches_total_independent_of_order() {
        let store = InMemoryStore::new();
        let wo = store
            .insert_work_order(work_order("Reparar parede norte", None))
            .await
            .unwrap();
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();
        let areia = store.insert_material(material("Areia", 10.0)).await.unwrap();

        store
            .attach_material(wo.work_order.id_typed(), areia.id_typed(), 5.0)
            .await
            .unwrap();
        let view = store
            .attach_material(wo.work_order.id_typed(), cimento.id_typed(), 2.0)
            .await
            .unwrap();

        assert_eq!(view.costs.lines.len(), 2);
        assert_eq!(view.costs.total, 150.0);
        // Insertion order is preserved.
        assert_eq!(view.costs.lines[0].name, "Areia");
        assert_eq!(view.costs.lines[1].name, "Cimento");
    }

    #[tokio::test]
    async fn repricing_a_material_retroactively_changes_totals() {
        let store = InMemoryStore::new();
        let wo = store
            .insert_work_order(work_order("Reparar parede", None))
            .await
            .unwrap();
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();
        store
            .attach_material(wo.work_order.id_typed(), cimento.id_typed(), 2.0)
            .await
            .unwrap();

        store
            .update_material(cimento.id_typed(), "Cimento".to_string(), 60.0)
            .await
            .unwrap();

        // No snapshotting: the ledger is costed at the current price.
        let view = store.work_order_view(wo.work_order.id_typed()).await.unwrap();
        assert_eq!(view.costs.lines[0].cost, 120.0);
        assert_eq!(view.costs.total, 120.0);
    }

    #[tokio::test]
    async fn duplicate_material_name_is_a_conflict() {
        let store = InMemoryStore::new();
        store.insert_material(material("Cimento", 50.0)).await.unwrap();

        let err = store
            .insert_material(material("Cimento", 60.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_material_rejects_name_collision_but_allows_own_name() {
        let store = InMemoryStore::new();
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();
        store.insert_material(material("Areia", 10.0)).await.unwrap();

        let err = store
            .update_material(cimento.id_typed(), "Areia".to_string(), 55.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));

        // Repricing under the same name is a full replace, not a rename.
        let updated = store
            .update_material(cimento.id_typed(), "Cimento".to_string(), 55.0)
            .await
            .unwrap();
        assert_eq!(updated.unit_price(), 55.0);
    }

    #[tokio::test]
    async fn bulk_insert_skips_duplicates_inside_and_outside_the_batch() {
        let store = InMemoryStore::new();
        store.insert_material(material("Cimento", 50.0)).await.unwrap();

        let inserted = store
            .insert_materials_bulk(vec![
                material("Cimento", 99.0), // exists in the catalog
                material("Areia", 10.0),
                material("Areia", 11.0), // duplicate within the batch
                material("Tinta", 30.0),
            ])
            .await
            .unwrap();

        let names: Vec<&str> = inserted.iter().map(|m| m.name()).collect();
        assert_eq!(names, ["Areia", "Tinta"]);
        // The pre-existing row kept its price.
        let kept = store.material_by_name("Cimento").await.unwrap().unwrap();
        assert_eq!(kept.unit_price(), 50.0);
    }

    #[tokio::test]
    async fn delete_material_refused_while_referenced_then_allowed() {
        let store = InMemoryStore::new();
        let wo = store
            .insert_work_order(work_order("Reparar parede", None))
            .await
            .unwrap();
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();
        store
            .attach_material(wo.work_order.id_typed(), cimento.id_typed(), 2.0)
            .await
            .unwrap();

        let err = store.delete_material(cimento.id_typed()).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));

        // Deleting the owning work order cascades the ledger, freeing the
        // material.
        store.delete_work_order(wo.work_order.id_typed()).await.unwrap();
        store.delete_material(cimento.id_typed()).await.unwrap();
        assert!(store.material_by_name("Cimento").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_materials_filters_sorts_and_paginates() {
        let store = InMemoryStore::new();
        store.insert_material(material("Cimento", 50.0)).await.unwrap();
        store.insert_material(material("Areia", 10.0)).await.unwrap();
        store.insert_material(material("Tinta", 30.0)).await.unwrap();

        let by_name: Vec<String> = store
            .list_materials(MaterialQuery::default())
            .await
            .unwrap()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(by_name, ["Areia", "Cimento", "Tinta"]);

        let by_price_desc = store
            .list_materials(MaterialQuery {
                sort_by: MaterialSortField::UnitPrice,
                sort_dir: SortDir::Desc,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_price_desc[0].name(), "Cimento");
        assert_eq!(by_price_desc[2].name(), "Areia");

        let filtered = store
            .list_materials(MaterialQuery {
                name_contains: Some("cim".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name(), "Cimento");

        let page = store
            .list_materials(MaterialQuery {
                offset: 1,
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name(), "Cimento");
    }

    #[tokio::test]
    async fn list_work_orders_filters_by_raw_status() {
        let store = InMemoryStore::new();
        store
            .insert_work_order(work_order("Obra A", Some("aberta")))
            .await
            .unwrap();
        store
            .insert_work_order(work_order("Obra B", Some("finalizada")))
            .await
            .unwrap();

        let open = store
            .list_work_orders(WorkOrderQuery {
                status: Some("ABERTA".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].work_order.summary(), "Obra A");

        let all = store.list_work_orders(WorkOrderQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn status_filter_folds_unicode_case() {
        let store = InMemoryStore::new();
        store
            .insert_work_order(work_order("Obra C", Some("concluída")))
            .await
            .unwrap();

        // Accented uppercase must still match the stored lowercase spelling.
        let finished = store
            .list_work_orders(WorkOrderQuery {
                status: Some("CONCLUÍDA".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].work_order.summary(), "Obra C");
    }

    #[tokio::test]
    async fn update_missing_material_is_not_found_even_with_colliding_name() {
        let store = InMemoryStore::new();
        store.insert_material(material("Cimento", 50.0)).await.unwrap();

        let err = store
            .update_material(MaterialId::new(), "Cimento".to_string(), 60.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_work_order_is_an_unguarded_full_replace() {
        let store = InMemoryStore::new();
        let wo = store
            .insert_work_order(work_order("Reparar parede", None))
            .await
            .unwrap();

        let updated = store
            .update_work_order(
                wo.work_order.id_typed(),
                "Reparar parede norte".to_string(),
                "finalizada".to_string(),
            )
            .await
            .unwrap();
        assert_eq!(updated.work_order.summary(), "Reparar parede norte");
        assert!(updated.work_order.is_finished());

        // Attaching now trips the guard, but existing entries stay readable.
        let cimento = store.insert_material(material("Cimento", 50.0)).await.unwrap();
        let err = store
            .attach_material(wo.work_order.id_typed(), cimento.id_typed(), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn delete_work_order_is_not_found_when_absent() {
        let store = InMemoryStore::new();
        let err = store.delete_work_order(WorkOrderId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::NotFound(_))));
    }
}
