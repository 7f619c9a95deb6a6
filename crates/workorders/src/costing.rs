//! Pure cost aggregation over a work order's consumption ledger.
//!
//! Costs are derived on demand from the *current* catalog price — nothing is
//! snapshotted at attach time, so repricing a material retroactively changes
//! the computed cost of past consumption. Deliberate, load-bearing behavior.

use oficina_catalog::Material;
use oficina_core::MaterialId;

use crate::consumption::ConsumptionEntry;
use crate::order::WorkOrder;

/// One costed ledger line: `cost = quantity × unit_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub material_id: MaterialId,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub cost: f64,
}

/// Costed view of a ledger: per-entry lines plus their sum.
#[derive(Debug, Clone, PartialEq)]
pub struct CostSummary {
    pub lines: Vec<LineItem>,
    pub total: f64,
}

impl CostSummary {
    /// The view of an empty ledger: no lines, total exactly `0.0`.
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total: 0.0,
        }
    }
}

impl Default for CostSummary {
    fn default() -> Self {
        Self::empty()
    }
}

/// A work order together with its computed cost view. What read endpoints
/// return.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderView {
    pub work_order: WorkOrder,
    pub costs: CostSummary,
}

/// Fold resolved `(entry, material)` pairs into a [`CostSummary`].
///
/// Callers resolve each entry against its catalog row first (the ledger's
/// referential invariant makes that resolution total); line order follows
/// input order, which the store keeps as ledger insertion order.
pub fn summarize<'a, I>(rows: I) -> CostSummary
where
    I: IntoIterator<Item = (&'a ConsumptionEntry, &'a Material)>,
{
    let mut lines = Vec::new();
    let mut total = 0.0;

    for (entry, material) in rows {
        let cost = entry.quantity() * material.unit_price();
        total += cost;
        lines.push(LineItem {
            material_id: material.id_typed(),
            name: material.name().to_string(),
            quantity: entry.quantity(),
            unit_price: material.unit_price(),
            cost,
        });
    }

    CostSummary { lines, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use oficina_core::{ConsumptionEntryId, WorkOrderId};

    fn material(name: &str, unit_price: f64) -> Material {
        Material::new(MaterialId::new(), name, unit_price, Utc::now()).unwrap()
    }

    fn entry(material: &Material, quantity: f64) -> ConsumptionEntry {
        ConsumptionEntry::from_stored(
            ConsumptionEntryId::new(),
            WorkOrderId::new(),
            material.id_typed(),
            quantity,
            Utc::now(),
        )
    }

    #[test]
    fn empty_ledger_yields_no_lines_and_total_zero() {
        let summary = summarize([]);
        assert!(summary.lines.is_empty());
        assert_eq!(summary.total, 0.0);
        assert_eq!(summary, CostSummary::empty());
    }

    #[test]
    fn line_cost_is_quantity_times_unit_price() {
        let cimento = material("Cimento", 50.0);
        let e = entry(&cimento, 2.0);

        let summary = summarize([(&e, &cimento)]);
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.lines[0].name, "Cimento");
        assert_eq!(summary.lines[0].quantity, 2.0);
        assert_eq!(summary.lines[0].unit_price, 50.0);
        assert_eq!(summary.lines[0].cost, 100.0);
        assert_eq!(summary.total, 100.0);
    }

    #[test]
    fn total_sums_lines_independent_of_order() {
        let cimento = material("Cimento", 50.0);
        let areia = material("Areia", 10.0);
        let e1 = entry(&cimento, 2.0);
        let e2 = entry(&areia, 5.0);

        let forward = summarize([(&e1, &cimento), (&e2, &areia)]);
        let reverse = summarize([(&e2, &areia), (&e1, &cimento)]);

        assert_eq!(forward.total, 150.0);
        assert_eq!(reverse.total, 150.0);
        // Lines keep input order.
        assert_eq!(forward.lines[0].name, "Cimento");
        assert_eq!(reverse.lines[0].name, "Areia");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: for positive q and p, the line cost is exactly q×p
            /// and the total is the sum of line costs.
            #[test]
            fn total_is_sum_of_line_costs(
                rows in proptest::collection::vec((0.01f64..1_000.0, 0.01f64..1_000.0), 0..12)
            ) {
                let materials: Vec<Material> = rows
                    .iter()
                    .enumerate()
                    .map(|(i, (_, p))| material(&format!("M{i}"), *p))
                    .collect();
                let entries: Vec<ConsumptionEntry> = rows
                    .iter()
                    .zip(&materials)
                    .map(|((q, _), m)| entry(m, *q))
                    .collect();

                let summary = summarize(entries.iter().zip(materials.iter()));

                let mut expected = 0.0;
                for (line, (q, p)) in summary.lines.iter().zip(&rows) {
                    prop_assert_eq!(line.cost, q * p);
                    expected += q * p;
                }
                prop_assert_eq!(summary.total, expected);
            }
        }
    }
}
