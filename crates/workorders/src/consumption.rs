//! The consumption ledger entry and the domain half of the attach guard.
//!
//! Existence of the referenced work order and material is the store's part of
//! the guard (it owns the lookups and the transaction); the checks that need
//! no IO live here.

use chrono::{DateTime, Utc};

use oficina_core::{ConsumptionEntryId, DomainError, DomainResult, Entity, MaterialId, WorkOrderId};

use crate::order::WorkOrder;

/// Entry in the consumption ledger: a quantity of one material consumed by
/// one work order. Immutable once recorded; removed only when the owning
/// work order is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionEntry {
    id: ConsumptionEntryId,
    work_order_id: WorkOrderId,
    material_id: MaterialId,
    quantity: f64,
    created_at: DateTime<Utc>,
}

impl ConsumptionEntry {
    /// Record consumption against an already-resolved work order.
    ///
    /// Rechecks the quantity and the terminal-state rule so an entry cannot
    /// be constructed around the guard.
    pub fn record(
        id: ConsumptionEntryId,
        work_order: &WorkOrder,
        material_id: MaterialId,
        quantity: f64,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_quantity(quantity)?;
        ensure_open(work_order)?;
        Ok(Self {
            id,
            work_order_id: work_order.id_typed(),
            material_id,
            quantity,
            created_at,
        })
    }

    /// Rehydrate from storage. Rows were validated on the way in.
    pub fn from_stored(
        id: ConsumptionEntryId,
        work_order_id: WorkOrderId,
        material_id: MaterialId,
        quantity: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            work_order_id,
            material_id,
            quantity,
            created_at,
        }
    }

    pub fn id_typed(&self) -> ConsumptionEntryId {
        self.id
    }

    pub fn work_order_id(&self) -> WorkOrderId {
        self.work_order_id
    }

    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for ConsumptionEntry {
    type Id = ConsumptionEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// First guard precondition: the quantity must be a positive number.
///
/// Checked at the boundary before any lookup runs; a bad quantity is a
/// request-validation failure, not a domain lookup failure.
pub fn validate_quantity(quantity: f64) -> DomainResult<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(DomainError::invalid_input(
            "quantity must be a positive number",
        ));
    }
    Ok(())
}

/// Terminal-state guard: no consumption may be recorded against a finished
/// work order. The message carries "finalizada" — clients detect the
/// terminal-state rejection by that word.
pub fn ensure_open(work_order: &WorkOrder) -> DomainResult<()> {
    if work_order.is_finished() {
        return Err(DomainError::invalid_state(
            "cannot add materials to a finalizada work order",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_order() -> WorkOrder {
        WorkOrder::new(WorkOrderId::new(), "Reparar parede", None, Utc::now()).unwrap()
    }

    fn finished_order(status: &str) -> WorkOrder {
        WorkOrder::new(
            WorkOrderId::new(),
            "Reparar parede",
            Some(status.to_string()),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn record_succeeds_on_open_order() {
        let wo = open_order();
        let entry = ConsumptionEntry::record(
            ConsumptionEntryId::new(),
            &wo,
            MaterialId::new(),
            2.0,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(entry.work_order_id(), wo.id_typed());
        assert_eq!(entry.quantity(), 2.0);
    }

    #[test]
    fn record_rejects_non_positive_quantity_as_invalid_input() {
        let wo = open_order();
        for quantity in [0.0, -5.0, f64::NAN] {
            let err = ConsumptionEntry::record(
                ConsumptionEntryId::new(),
                &wo,
                MaterialId::new(),
                quantity,
                Utc::now(),
            )
            .unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)), "{quantity}");
        }
    }

    #[test]
    fn record_rejects_every_finished_spelling() {
        for status in ["finalizado", "finalizada", "fechada", "concluida", "concluída", "FINALIZADA"] {
            let wo = finished_order(status);
            let err = ConsumptionEntry::record(
                ConsumptionEntryId::new(),
                &wo,
                MaterialId::new(),
                2.0,
                Utc::now(),
            )
            .unwrap_err();
            match err {
                DomainError::InvalidState(msg) => {
                    assert!(msg.to_lowercase().contains("finalizada"), "{status}: {msg}")
                }
                other => panic!("expected InvalidState for {status}, got {other:?}"),
            }
        }
    }

    #[test]
    fn quantity_check_runs_before_state_check() {
        // A bad quantity on a finished order must still surface as
        // InvalidInput: request validation precedes the domain guard.
        let wo = finished_order("finalizada");
        let err = ConsumptionEntry::record(
            ConsumptionEntryId::new(),
            &wo,
            MaterialId::new(),
            0.0,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}
