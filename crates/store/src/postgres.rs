//! Postgres-backed store.
//!
//! Runs every operation as one bounded transaction. The attach guard takes a
//! `SELECT ... FOR UPDATE` row lock on the work order so a concurrent status
//! update cannot slip between the terminal-state check and the ledger insert.
//!
//! ## Error mapping
//!
//! | PostgreSQL error code | `StoreError` | Scenario |
//! |-----------------------|--------------|----------|
//! | `23505` (unique violation) | `Domain(Conflict)` | Duplicate material name |
//! | `23503` (foreign key violation) | `Domain(Conflict)` | Material still referenced by the ledger |
//! | any other | `Backend` | Connection loss, constraint drift, corrupt row |

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use oficina_catalog::Material;
use oficina_core::{ConsumptionEntryId, DomainError, MaterialId, WorkOrderId};
use oficina_workorders::{ConsumptionEntry, WorkOrder, WorkOrderView, consumption, costing};

use crate::error::{StoreError, StoreResult};
use crate::query::{MaterialQuery, MaterialSortField, SortDir, WorkOrderQuery};
use crate::r#trait::Store;

/// Create the schema if it does not exist yet. Idempotent; run once at boot.
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS materials (
            id UUID PRIMARY KEY,
            name VARCHAR(200) NOT NULL UNIQUE,
            unit_price DOUBLE PRECISION NOT NULL CHECK (unit_price > 0),
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_error("ensure_schema", e))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_orders (
            id UUID PRIMARY KEY,
            summary VARCHAR(500) NOT NULL,
            status VARCHAR(50) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_error("ensure_schema", e))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS material_consumptions (
            id UUID PRIMARY KEY,
            work_order_id UUID NOT NULL REFERENCES work_orders (id) ON DELETE CASCADE,
            material_id UUID NOT NULL REFERENCES materials (id),
            quantity DOUBLE PRECISION NOT NULL CHECK (quantity > 0),
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_error("ensure_schema", e))?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_view(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        work_order: &WorkOrder,
    ) -> StoreResult<WorkOrderView> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.work_order_id, c.material_id, c.quantity, c.created_at,
                   m.name, m.unit_price, m.created_at AS material_created_at
            FROM material_consumptions c
            JOIN materials m ON m.id = c.material_id
            WHERE c.work_order_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(work_order.id_typed().as_uuid())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_view", e))?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = entry_from_row(&row)?;
            let material = Material::from_stored(
                MaterialId::from_uuid(row.try_get("material_id").map_err(row_error)?),
                row.try_get("name").map_err(row_error)?,
                row.try_get("unit_price").map_err(row_error)?,
                row.try_get("material_created_at").map_err(row_error)?,
            );
            pairs.push((entry, material));
        }
        Ok(WorkOrderView {
            work_order: work_order.clone(),
            costs: costing::summarize(pairs.iter().map(|(e, m)| (e, m))),
        })
    }

    async fn fetch_work_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: WorkOrderId,
        for_update: bool,
    ) -> StoreResult<WorkOrder> {
        let sql = if for_update {
            "SELECT id, summary, status, created_at FROM work_orders WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, summary, status, created_at FROM work_orders WHERE id = $1"
        };
        let row = sqlx::query(sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_work_order", e))?
            .ok_or_else(|| DomainError::not_found("work order"))?;
        work_order_from_row(&row)
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self, material), fields(name = material.name()), err)]
    async fn insert_material(&self, material: Material) -> StoreResult<Material> {
        sqlx::query(
            "INSERT INTO materials (id, name, unit_price, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(material.id_typed().as_uuid())
        .bind(material.name())
        .bind(material.unit_price())
        .bind(material.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_material", e))?;
        Ok(material)
    }

    #[instrument(skip(self, materials), fields(batch = materials.len()), err)]
    async fn insert_materials_bulk(&self, materials: Vec<Material>) -> StoreResult<Vec<Material>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut inserted = Vec::new();
        for material in materials {
            // ON CONFLICT DO NOTHING covers duplicates in the catalog and
            // earlier in the batch alike.
            let result = sqlx::query(
                r#"
                INSERT INTO materials (id, name, unit_price, created_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(material.id_typed().as_uuid())
            .bind(material.name())
            .bind(material.unit_price())
            .bind(material.created_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_materials_bulk", e))?;
            if result.rows_affected() == 1 {
                inserted.push(material);
            } else {
                tracing::debug!(name = material.name(), "bulk insert skipping duplicate");
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(inserted)
    }

    #[instrument(skip(self), fields(material = %id), err)]
    async fn material(&self, id: MaterialId) -> StoreResult<Material> {
        let row = sqlx::query(
            "SELECT id, name, unit_price, created_at FROM materials WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("material", e))?
        .ok_or_else(|| DomainError::not_found("material"))?;
        material_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn material_by_name(&self, name: &str) -> StoreResult<Option<Material>> {
        let row = sqlx::query(
            "SELECT id, name, unit_price, created_at FROM materials WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("material_by_name", e))?;
        row.as_ref().map(material_from_row).transpose()
    }

    #[instrument(skip(self, query), err)]
    async fn list_materials(&self, query: MaterialQuery) -> StoreResult<Vec<Material>> {
        // ORDER BY is built from closed enums, never from client strings.
        let order_column = match query.sort_by {
            MaterialSortField::Name => "name",
            MaterialSortField::UnitPrice => "unit_price",
        };
        let order_dir = match query.sort_dir {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        };
        let sql = format!(
            r#"
            SELECT id, name, unit_price, created_at
            FROM materials
            WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
            ORDER BY {order_column} {order_dir}
            OFFSET $2 LIMIT $3
            "#,
        );
        let rows = sqlx::query(&sql)
            .bind(query.name_contains.as_deref().map(escape_like))
            .bind(i64::from(query.offset))
            .bind(i64::from(query.effective_limit()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_materials", e))?;
        rows.iter().map(material_from_row).collect()
    }

    #[instrument(skip(self, name), fields(material = %id), err)]
    async fn update_material(
        &self,
        id: MaterialId,
        name: String,
        unit_price: f64,
    ) -> StoreResult<Material> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            "SELECT id, name, unit_price, created_at FROM materials WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_material", e))?
        .ok_or_else(|| DomainError::not_found("material"))?;

        let mut material = material_from_row(&row)?;
        material.replace(name, unit_price)?;

        sqlx::query("UPDATE materials SET name = $2, unit_price = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(material.name())
            .bind(material.unit_price())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_material", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(material)
    }

    #[instrument(skip(self), fields(material = %id), err)]
    async fn delete_material(&self, id: MaterialId) -> StoreResult<()> {
        // The FK from material_consumptions has no cascade, so a referenced
        // material surfaces as 23503 and maps to Conflict.
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_material", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("material").into());
        }
        Ok(())
    }

    #[instrument(skip(self, work_order), fields(work_order = %work_order.id_typed()), err)]
    async fn insert_work_order(&self, work_order: WorkOrder) -> StoreResult<WorkOrderView> {
        sqlx::query(
            "INSERT INTO work_orders (id, summary, status, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(work_order.id_typed().as_uuid())
        .bind(work_order.summary())
        .bind(work_order.status_raw())
        .bind(work_order.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_work_order", e))?;
        Ok(WorkOrderView {
            work_order,
            costs: costing::CostSummary::empty(),
        })
    }

    #[instrument(skip(self), fields(work_order = %id), err)]
    async fn work_order_view(&self, id: WorkOrderId) -> StoreResult<WorkOrderView> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let work_order = self.fetch_work_order(&mut tx, id, false).await?;
        let view = self.load_view(&mut tx, &work_order).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(view)
    }

    #[instrument(skip(self, query), err)]
    async fn list_work_orders(&self, query: WorkOrderQuery) -> StoreResult<Vec<WorkOrderView>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let rows = sqlx::query(
            r#"
            SELECT id, summary, status, created_at
            FROM work_orders
            WHERE ($1::TEXT IS NULL OR LOWER(status) = LOWER(TRIM($1)))
            ORDER BY created_at ASC, id ASC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(query.status.as_deref())
        .bind(i64::from(query.offset))
        .bind(i64::from(query.effective_limit()))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("list_work_orders", e))?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let work_order = work_order_from_row(row)?;
            views.push(self.load_view(&mut tx, &work_order).await?);
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(views)
    }

    #[instrument(skip(self, summary, status), fields(work_order = %id), err)]
    async fn update_work_order(
        &self,
        id: WorkOrderId,
        summary: String,
        status: String,
    ) -> StoreResult<WorkOrderView> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut work_order = self.fetch_work_order(&mut tx, id, true).await?;
        work_order.replace(summary, status)?;

        sqlx::query("UPDATE work_orders SET summary = $2, status = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(work_order.summary())
            .bind(work_order.status_raw())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_work_order", e))?;

        let view = self.load_view(&mut tx, &work_order).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(view)
    }

    #[instrument(skip(self), fields(work_order = %id), err)]
    async fn delete_work_order(&self, id: WorkOrderId) -> StoreResult<()> {
        // ON DELETE CASCADE clears the ledger in the same statement.
        let result = sqlx::query("DELETE FROM work_orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_work_order", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("work order").into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(work_order = %work_order_id, material = %material_id, quantity), err)]
    async fn attach_material(
        &self,
        work_order_id: WorkOrderId,
        material_id: MaterialId,
        quantity: f64,
    ) -> StoreResult<WorkOrderView> {
        consumption::validate_quantity(quantity)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Row lock: holds off concurrent status updates until commit.
        let work_order = self.fetch_work_order(&mut tx, work_order_id, true).await?;
        consumption::ensure_open(&work_order)?;

        let material_row = sqlx::query("SELECT id FROM materials WHERE id = $1")
            .bind(material_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("attach_material", e))?;
        if material_row.is_none() {
            return Err(DomainError::not_found("material").into());
        }

        let entry = ConsumptionEntry::record(
            ConsumptionEntryId::new(),
            &work_order,
            material_id,
            quantity,
            chrono::Utc::now(),
        )?;
        sqlx::query(
            r#"
            INSERT INTO material_consumptions (id, work_order_id, material_id, quantity, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id_typed().as_uuid())
        .bind(entry.work_order_id().as_uuid())
        .bind(entry.material_id().as_uuid())
        .bind(entry.quantity())
        .bind(entry.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("attach_material", e))?;

        let view = self.load_view(&mut tx, &work_order).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        tracing::debug!(
            work_order = %work_order_id,
            material = %material_id,
            quantity,
            "recorded material consumption"
        );
        Ok(view)
    }
}

fn material_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<Material> {
    Ok(Material::from_stored(
        MaterialId::from_uuid(row.try_get("id").map_err(row_error)?),
        row.try_get("name").map_err(row_error)?,
        row.try_get("unit_price").map_err(row_error)?,
        row.try_get("created_at").map_err(row_error)?,
    ))
}

fn work_order_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<WorkOrder> {
    Ok(WorkOrder::from_stored(
        WorkOrderId::from_uuid(row.try_get("id").map_err(row_error)?),
        row.try_get("summary").map_err(row_error)?,
        row.try_get("status").map_err(row_error)?,
        row.try_get("created_at").map_err(row_error)?,
    ))
}

fn entry_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<ConsumptionEntry> {
    Ok(ConsumptionEntry::from_stored(
        ConsumptionEntryId::from_uuid(row.try_get("id").map_err(row_error)?),
        WorkOrderId::from_uuid(row.try_get("work_order_id").map_err(row_error)?),
        MaterialId::from_uuid(row.try_get("material_id").map_err(row_error)?),
        row.try_get("quantity").map_err(row_error)?,
        row.try_get("created_at").map_err(row_error)?,
    ))
}

fn row_error(err: sqlx::Error) -> StoreError {
    StoreError::backend(format!("failed to decode row: {err}"))
}

/// Escape LIKE metacharacters so a filter value matches as a literal
/// substring, the same semantics the in-memory backend has.
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: duplicate material name.
                Some("23505") => StoreError::Domain(DomainError::conflict(
                    "a material with that name already exists",
                )),
                // Foreign key violation: material still referenced.
                Some("23503") => StoreError::Domain(DomainError::conflict(
                    "material is referenced by consumption entries",
                )),
                _ => StoreError::Backend(msg),
            }
        }
        other => StoreError::Backend(format!("database error in {operation}: {other}")),
    }
}
