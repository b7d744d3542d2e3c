//! Listing filters and pagination
//!
//! The logical filter shown as a tab maps to two predicates on a record: the
//! soft-delete scope and an optional type equality. Pages are 1-indexed and
//! counted after the soft-delete filter has been applied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::transaction::{Transaction, TransactionType};

/// Page size used when the URL does not carry a valid `limit`
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page sizes offered by the page size selector
pub const PAGE_SIZE_OPTIONS: &[u32] = &[5, 10, 15, 20, 50];

/// Filter tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Income,
    Outcome,
    Deleted,
}

impl Filter {
    pub const ALL: [Filter; 4] = [Filter::All, Filter::Income, Filter::Outcome, Filter::Deleted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Income => "income",
            Filter::Outcome => "outcome",
            Filter::Deleted => "deleted",
        }
    }

    /// Tab label
    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Income => "Income",
            Filter::Outcome => "Outcome",
            Filter::Deleted => "Deleted",
        }
    }

    /// Type equality filter passed through to the backend
    pub fn type_filter(&self) -> Option<TransactionType> {
        match self {
            Filter::Income => Some(TransactionType::Income),
            Filter::Outcome => Some(TransactionType::Outcome),
            Filter::All | Filter::Deleted => None,
        }
    }

    /// Soft-delete scope of this tab
    pub fn deleted_scope(&self) -> DeletedScope {
        match self {
            Filter::Deleted => DeletedScope::OnlyDeleted,
            _ => DeletedScope::ActiveOnly,
        }
    }

    /// Whether a record belongs to this tab
    pub fn matches(&self, tx: &Transaction) -> bool {
        let type_ok = self.type_filter().map_or(true, |t| tx.kind == t);
        type_ok && self.deleted_scope().matches(tx)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "income" => Ok(Filter::Income),
            "outcome" => Ok(Filter::Outcome),
            "deleted" => Ok(Filter::Deleted),
            other => Err(Error::validation(format!("unknown filter '{}'", other))),
        }
    }
}

/// Which records a listing includes with respect to `deletedAt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletedScope {
    /// `deletedAt == null`
    ActiveOnly,
    /// `deletedAt != null`
    OnlyDeleted,
}

impl DeletedScope {
    pub fn matches(&self, tx: &Transaction) -> bool {
        match self {
            DeletedScope::ActiveOnly => !tx.is_deleted(),
            DeletedScope::OnlyDeleted => tx.is_deleted(),
        }
    }
}

/// Cache key and request description for one page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListQuery {
    pub filter: Filter,
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    /// Build a query, replacing zero page/limit with the defaults
    pub fn new(filter: Filter, page: u32, limit: u32) -> Self {
        Self {
            filter,
            page: page.max(1),
            limit: if limit == 0 { DEFAULT_PAGE_SIZE } else { limit },
        }
    }

    /// Zero-based index of the first record on this page
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(Filter::All, 1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        Self {
            data,
            total,
            page,
            limit,
            total_pages: total_pages(total, limit),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// `ceil(total / limit)`
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    let limit = u64::from(limit);
    u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX)
}

/// Apply a listing to a full set of records: filter, newest first, slice
pub fn paginate(records: Vec<Transaction>, query: &ListQuery) -> Page<Transaction> {
    let mut matching: Vec<Transaction> = records
        .into_iter()
        .filter(|tx| query.filter.matches(tx))
        .collect();
    sort_newest_first(&mut matching);

    let total = matching.len() as u64;
    let data = matching
        .into_iter()
        .skip(query.offset())
        .take(query.limit as usize)
        .collect();

    Page::new(data, total, query.page, query.limit)
}

/// Sort by creation time, most recent first (stable for equal timestamps)
pub fn sort_newest_first(records: &mut [Transaction]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Item of the pagination control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "lowercase")]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Page buttons to render
///
/// Up to five pages are all shown. Beyond that the first page, the last page
/// and the neighbours of the current page are shown, with an ellipsis for
/// every gap.
pub fn visible_pages(current: u32, total: u32) -> Vec<PageItem> {
    let pages = (1..=total).filter(|&p| total <= 5 || p == 1 || p == total || p.abs_diff(current) <= 1);

    let mut items = Vec::new();
    let mut previous: Option<u32> = None;
    for page in pages {
        if let Some(prev) = previous {
            if page - prev > 1 {
                items.push(PageItem::Ellipsis);
            }
        }
        items.push(PageItem::Page(page));
        previous = Some(page);
    }
    items
}
