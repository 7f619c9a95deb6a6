//! `oficina-workorders` — the work-order domain.
//!
//! Holds the pieces with actual invariants: the status model and its single
//! normalization authority, the consumption guard, the consumption ledger
//! entry, and the pure cost aggregator.

pub mod consumption;
pub mod costing;
pub mod order;
pub mod status;

pub use consumption::ConsumptionEntry;
pub use costing::{CostSummary, LineItem, WorkOrderView};
pub use order::{DEFAULT_STATUS, MAX_STATUS_LEN, MAX_SUMMARY_LEN, WorkOrder};
pub use status::StatusKind;
