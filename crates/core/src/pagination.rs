//! Page-based pagination used by the CRUD generator and list endpoints.

use serde::{Deserialize, Serialize};

/// Default page when the caller does not send one.
pub const DEFAULT_PAGE: i64 = 1;
/// Default page size.
pub const DEFAULT_LIMIT: i64 = 10;
/// Hard upper bound on page size.
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A single `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

/// Caller-supplied pagination; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationOptions {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
}

/// Pagination after defaults and clamping have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub order_by: Vec<OrderBy>,
}

impl Pagination {
    /// Number of rows to skip for this page. Saturates for absurd pages so
    /// the query simply returns nothing.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Apply defaults and clamp to `page >= 1`, `1 <= limit <= MAX_LIMIT`.
///
/// A zero or missing value falls back to the default, matching how the API
/// treats `?page=0`.
pub fn sanitize_pagination(options: &PaginationOptions) -> Pagination {
    let page = match options.page {
        Some(p) if p != 0 => p.max(1),
        _ => DEFAULT_PAGE,
    };
    let limit = match options.limit {
        Some(l) if l != 0 => l.clamp(1, MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };
    let order_by = if options.order_by.is_empty() {
        vec![OrderBy::new("id", SortDirection::Desc)]
    } else {
        options.order_by.clone()
    };
    Pagination {
        page,
        limit,
        order_by,
    }
}

/// Metadata describing one page of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of rows plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}
