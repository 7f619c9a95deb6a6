//! `oficina-store` — the persistence collaborator.
//!
//! One [`Store`] trait covers every operation the boundary consumes; the
//! in-memory backend serves dev and tests, the Postgres backend (behind the
//! `postgres` feature) serves production. Both implement the attach guard as
//! a single atomic unit: the in-memory store holds its lock across the whole
//! check-and-insert, the Postgres store wraps it in a transaction with a row
//! lock on the work order.

pub mod error;
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresStore, ensure_schema};
pub use query::{MaterialQuery, MaterialSortField, SortDir, WorkOrderQuery};
pub use r#trait::Store;
