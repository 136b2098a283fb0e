//! Pagination, sort allow-list and response metadata for list endpoints.

use serde::{Deserialize, Serialize};

use crate::validator::{ValidationErrors, Validator, permitted_value};

/// Generic sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Movie columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Id,
    Title,
    Year,
    Runtime,
}

impl SortColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Year => "year",
            Self::Runtime => "runtime",
        }
    }
}

/// Sort keys accepted from clients. A leading `-` means descending.
pub const SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: SortColumn,
    pub direction: Sort,
}

impl SortKey {
    /// Parse a client sort key. Anything outside [`SORT_SAFELIST`] is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        if !permitted_value(&raw, SORT_SAFELIST) {
            return None;
        }
        let (direction, name) = match raw.strip_prefix('-') {
            Some(name) => (Sort::Desc, name),
            None => (Sort::Asc, raw),
        };
        let column = match name {
            "id" => SortColumn::Id,
            "title" => SortColumn::Title,
            "year" => SortColumn::Year,
            "runtime" => SortColumn::Runtime,
            _ => return None,
        };
        Some(Self { column, direction })
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            column: SortColumn::Id,
            direction: Sort::Asc,
        }
    }
}

/// Validated page window and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filters {
    pub page: u32,
    pub page_size: u32,
    pub sort: SortKey,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE as u32,
            page_size: DEFAULT_PAGE_SIZE as u32,
            sort: SortKey::default(),
        }
    }
}

impl Filters {
    /// Validate raw query values. The sort key is rejected here, before any query runs.
    pub fn parse(page: i64, page_size: i64, sort: &str) -> Result<Self, ValidationErrors> {
        let mut v = Validator::new();
        v.check(page > 0, "page", "must be greater than zero");
        v.check(page <= MAX_PAGE, "page", "must be a maximum of 10 million");
        v.check(page_size > 0, "page_size", "must be greater than zero");
        v.check(page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");
        let key = SortKey::parse(sort);
        v.check(key.is_some(), "sort", "invalid sort value");
        v.finish()?;
        Ok(Self {
            page: page as u32,
            page_size: page_size as u32,
            sort: key.unwrap_or_default(),
        })
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// Pagination metadata. Serializes to `{}` when nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl Metadata {
    pub fn calculate(total_records: u64, filters: &Filters) -> Self {
        if total_records == 0 {
            return Self::default();
        }
        let page_size = u64::from(filters.page_size);
        Self {
            current_page: u64::from(filters.page),
            page_size,
            first_page: 1,
            last_page: total_records.div_ceil(page_size),
            total_records,
        }
    }
}
