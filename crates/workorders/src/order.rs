use chrono::{DateTime, Utc};

use oficina_core::{DomainError, DomainResult, Entity, WorkOrderId};

use crate::status;

/// Upper bound on the free-text summary (storage column width).
pub const MAX_SUMMARY_LEN: usize = 500;

/// Upper bound on the raw status string (storage column width).
pub const MAX_STATUS_LEN: usize = 50;

/// Status assigned when a work order is created without one.
pub const DEFAULT_STATUS: &str = "aberta";

/// Entity: a maintenance work order.
///
/// The status keeps its raw spelling so historical clients round-trip
/// `"aberta"`/`"concluída"` unchanged; whether it is terminal is decided by
/// [`crate::status::StatusKind`] alone. Updates are full replaces with no
/// transition guard — only the attach-material path is guarded.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrder {
    id: WorkOrderId,
    summary: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl WorkOrder {
    /// Create a new work order. A missing status defaults to
    /// [`DEFAULT_STATUS`].
    pub fn new(
        id: WorkOrderId,
        summary: impl Into<String>,
        status: Option<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let summary = validate_summary(summary.into())?;
        let status = validate_status(status.unwrap_or_else(|| DEFAULT_STATUS.to_string()))?;
        Ok(Self {
            id,
            summary,
            status,
            created_at,
        })
    }

    /// Rehydrate from storage. Rows were validated on the way in.
    pub fn from_stored(
        id: WorkOrderId,
        summary: String,
        status: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            summary,
            status,
            created_at,
        }
    }

    /// Full replace of summary and status (update semantics). Transitioning
    /// into or out of a finished status is allowed here by design.
    pub fn replace(&mut self, summary: impl Into<String>, status: impl Into<String>) -> DomainResult<()> {
        let summary = validate_summary(summary.into())?;
        let status = validate_status(status.into())?;
        self.summary = summary;
        self.status = status;
        Ok(())
    }

    pub fn id_typed(&self) -> WorkOrderId {
        self.id
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// The raw status spelling as supplied by the client.
    pub fn status_raw(&self) -> &str {
        &self.status
    }

    /// Whether this work order is in a terminal state.
    pub fn is_finished(&self) -> bool {
        status::is_finished(&self.status)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for WorkOrder {
    type Id = WorkOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_summary(summary: String) -> DomainResult<String> {
    let trimmed = summary.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_input("summary cannot be empty"));
    }
    if trimmed.chars().count() > MAX_SUMMARY_LEN {
        return Err(DomainError::invalid_input(format!(
            "summary exceeds {MAX_SUMMARY_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_status(status: String) -> DomainResult<String> {
    let trimmed = status.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_input("status cannot be empty"));
    }
    if trimmed.chars().count() > MAX_STATUS_LEN {
        return Err(DomainError::invalid_input(format!(
            "status exceeds {MAX_STATUS_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
