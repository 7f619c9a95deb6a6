//! Listing parameters for the flat catalog and the work-order collection.

/// Default page size when the caller does not bound the listing.
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialSortField {
    #[default]
    Name,
    UnitPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// Catalog listing: optional case-insensitive name substring filter, sort by
/// name or unit price, offset/limit pagination.
#[derive(Debug, Clone, Default)]
pub struct MaterialQuery {
    pub name_contains: Option<String>,
    pub sort_by: MaterialSortField,
    pub sort_dir: SortDir,
    pub offset: u32,
    pub limit: Option<u32>,
}

impl MaterialQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// Work-order listing: optional case-insensitive raw-status filter plus
/// offset/limit pagination.
#[derive(Debug, Clone, Default)]
pub struct WorkOrderQuery {
    pub status: Option<String>,
    pub offset: u32,
    pub limit: Option<u32>,
}

impl WorkOrderQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}
