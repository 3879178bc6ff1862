//! Pagination over ordered, filtered collections.
//!
//! The page arithmetic lives in [`Page::new`] and is shared by the in-memory
//! [`paginate`] and by repository queries that run `COUNT(*)` plus
//! `LIMIT/OFFSET` against SQLite.

mod sort;

pub use sort::*;

use serde::Serialize;

use crate::errors::AppError;

/// One page of an ordered collection plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based index of this page
    pub page_index: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Assemble a page from an already sliced set of items.
    ///
    /// `page_size` must be positive; callers validate it through
    /// [`check_page_size`] before touching the source.
    pub fn new(items: Vec<T>, total_count: i64, page_index: i64, page_size: i64) -> Self {
        let total_count = total_count.max(0);
        let total_pages = if page_size > 0 {
            (total_count + page_size - 1) / page_size
        } else {
            0
        };

        Self {
            items,
            page_index,
            page_size,
            total_count,
            total_pages,
            has_previous: page_index > 1,
            has_next: page_index < total_pages,
        }
    }
}

/// Resolve a requested page number: absent or < 1 means the first page.
pub fn page_index_or_default(page_number: Option<i64>) -> i64 {
    match page_number {
        Some(n) if n >= 1 => n,
        _ => 1,
    }
}

pub fn check_page_size(page_size: i64) -> Result<(), AppError> {
    if page_size <= 0 {
        return Err(AppError::InvalidInput(format!(
            "Page size must be positive, got {}",
            page_size
        )));
    }
    Ok(())
}

/// Row offset of the first item on `page_index`.
pub fn page_offset(page_index: i64, page_size: i64) -> i64 {
    (page_index - 1).max(0).saturating_mul(page_size)
}

/// Slice one page out of an already filtered and ordered source.
pub fn paginate<T: Clone>(
    source: &[T],
    page_number: Option<i64>,
    page_size: i64,
) -> Result<Page<T>, AppError> {
    check_page_size(page_size)?;

    let page_index = page_index_or_default(page_number);
    let offset = usize::try_from(page_offset(page_index, page_size)).unwrap_or(usize::MAX);
    let limit = usize::try_from(page_size).unwrap_or(usize::MAX);

    let items = source.iter().skip(offset).take(limit).cloned().collect();
    let total_count = i64::try_from(source.len()).unwrap_or(i64::MAX);

    Ok(Page::new(items, total_count, page_index, page_size))
}

/// A list request after query-string resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest<F> {
    /// Explicitly requested order, if any
    pub sort: Option<SortOrder<F>>,
    /// Substring filter; `None` lists everything
    pub filter: Option<String>,
    pub page_index: i64,
    pub page_size: i64,
}

impl<F: SortField> PageRequest<F> {
    /// Build a request from the raw list parameters.
    ///
    /// A fresh `search_string` replaces `current_filter` and restarts at page 1;
    /// otherwise the previously applied filter carries over with the requested page.
    pub fn from_params(
        sort_order: Option<&str>,
        current_filter: Option<&str>,
        search_string: Option<&str>,
        page_number: Option<i64>,
        page_size: i64,
    ) -> Result<Self, AppError> {
        check_page_size(page_size)?;

        let sort = SortOrder::parse(sort_order)?;

        let search_string = non_blank(search_string);
        let (filter, page_index) = match search_string {
            Some(search) => (Some(search), 1),
            None => (non_blank(current_filter), page_index_or_default(page_number)),
        };

        Ok(Self {
            sort,
            filter,
            page_index,
            page_size,
        })
    }

    /// Order actually applied to the query.
    pub fn order(&self) -> SortOrder<F> {
        self.sort.unwrap_or_default()
    }

    pub fn offset(&self) -> i64 {
        page_offset(self.page_index, self.page_size)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
