//! This modules defines the common functionality for paging data.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// The config for pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// The page number to start a listing on.
    pub default_page: u64,
    /// The number of items to request per page when the caller does not choose one.
    pub default_page_size: PageSize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: PageSize::Twenty,
        }
    }
}

/// The number of items per page that the server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PageSize {
    /// 10 items per page.
    Ten,
    /// 20 items per page.
    #[default]
    Twenty,
    /// 50 items per page.
    Fifty,
    /// 100 items per page, the server maximum.
    Hundred,
}

impl PageSize {
    /// All supported page sizes in increasing order.
    pub const ALL: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::Twenty,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    /// The largest page size, used when walking every page of a resource.
    pub const MAX: PageSize = PageSize::Hundred;

    /// The number of items per page.
    pub fn get(self) -> u64 {
        match self {
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }
}

impl TryFrom<u64> for PageSize {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|size| size.get() == value)
            .ok_or(Error::InvalidPageSize(value))
    }
}

impl Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// The number of pages needed to show `total_count` items.
///
/// An empty result set still has one (empty) page so that page 1 is always a
/// valid page number.
pub fn total_pages(total_count: u64, page_size: PageSize) -> u64 {
    total_count.div_ceil(page_size.get()).max(1)
}

/// One bounded slice of a larger result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on this page in server order.
    pub items: Vec<T>,
    /// The 1-based page number.
    pub page_number: u64,
    /// The page size that was requested.
    pub page_size: PageSize,
    /// The number of items across all pages, as reported by the server.
    pub total_count: u64,
}

impl<T> Page<T> {
    /// Create a page, truncating `items` to `page_size` if the server sent too many.
    pub fn new(mut items: Vec<T>, page_number: u64, page_size: PageSize, total_count: u64) -> Self {
        let limit = page_size.get() as usize;

        if items.len() > limit {
            tracing::warn!(
                "server returned {} items for a page of {limit}, dropping the excess",
                items.len()
            );
            items.truncate(limit);
        }

        Self {
            items,
            page_number: page_number.max(1),
            page_size,
            total_count,
        }
    }

    /// The number of pages in the result set this page belongs to.
    pub fn total_pages(&self) -> u64 {
        total_pages(self.total_count, self.page_size)
    }

    /// Whether there is a page after this one.
    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages()
    }

    /// Whether there is a page before this one.
    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    /// Whether the page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The wire shape of a paginated list response: `{ results, count }`.
///
/// Some server versions return a bare array holding every item, which is
/// paged locally.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Paginated { results: Vec<T>, count: u64 },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub(crate) fn into_page(self, page_number: u64, page_size: PageSize) -> Page<T> {
        match self {
            ListResponse::Paginated { results, count } => {
                Page::new(results, page_number, page_size, count)
            }
            ListResponse::Bare(items) => {
                let count = items.len() as u64;
                let skip = (page_number.max(1) - 1).saturating_mul(page_size.get());
                let items = items
                    .into_iter()
                    .skip(usize::try_from(skip).unwrap_or(usize::MAX))
                    .take(page_size.get() as usize)
                    .collect();

                Page::new(items, page_number, page_size, count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        pagination::{ListResponse, Page, PageSize, total_pages},
    };

    #[test]
    fn total_pages_is_one_for_empty_result() {
        assert_eq!(total_pages(0, PageSize::Twenty), 1);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(20, PageSize::Twenty), 1);
        assert_eq!(total_pages(21, PageSize::Twenty), 2);
        assert_eq!(total_pages(101, PageSize::Fifty), 3);
    }

    #[test]
    fn page_size_accepts_supported_values() {
        for size in [10, 20, 50, 100] {
            assert_eq!(PageSize::try_from(size).map(PageSize::get), Ok(size));
        }
    }

    #[test]
    fn page_size_rejects_unsupported_values() {
        assert_eq!(PageSize::try_from(25), Err(Error::InvalidPageSize(25)));
        assert_eq!(PageSize::try_from(0), Err(Error::InvalidPageSize(0)));
    }

    #[test]
    fn page_truncates_oversized_results() {
        let page = Page::new((0..15).collect(), 1, PageSize::Ten, 15);

        assert_eq!(page.items.len(), 10);
        assert!(page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn paginated_response_uses_server_count() {
        let response: ListResponse<i64> =
            serde_json::from_str(r#"{"results": [1, 2, 3], "count": 43, "next": null}"#).unwrap();

        let page = response.into_page(2, PageSize::Twenty);

        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.total_count, 43);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn bare_array_response_is_a_single_page() {
        let response: ListResponse<i64> = serde_json::from_str("[4, 5]").unwrap();

        let page = response.into_page(1, PageSize::Twenty);

        assert_eq!(page.items, vec![4, 5]);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn bare_array_response_is_paged_locally() {
        let response: ListResponse<i64> =
            serde_json::from_value(serde_json::json!((1..=25).collect::<Vec<i64>>())).unwrap();

        let page = response.into_page(2, PageSize::Twenty);

        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total_count, 25);
        assert!(!page.has_next());
        assert!(page.has_previous());
    }

    #[test]
    fn bare_array_first_page_stops_at_page_size() {
        let response: ListResponse<i64> =
            serde_json::from_value(serde_json::json!((1..=25).collect::<Vec<i64>>())).unwrap();

        let page = response.into_page(1, PageSize::Twenty);

        assert_eq!(page.items, (1..=20).collect::<Vec<i64>>());
        assert!(page.has_next());
    }

    #[test]
    fn empty_response_is_a_valid_page() {
        let response: ListResponse<i64> =
            serde_json::from_str(r#"{"results": [], "count": 0}"#).unwrap();

        let page = response.into_page(1, PageSize::Twenty);

        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 1);
        assert!(!page.has_next());
    }
}
