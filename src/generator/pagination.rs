//! Fixed-size page slicing with the metadata API consumers expect

use serde::Serialize;

/// Pagination block attached to every paged document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub posts_per_page: usize,
    pub total_posts: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// A page of items plus its metadata
#[derive(Debug, Serialize)]
pub struct Page<'a, T> {
    pub posts: &'a [T],
    pub pagination: Pagination,
}

pub struct Paginator<'a, T> {
    items: &'a [T],
    per_page: usize,
}

impl<'a, T> Paginator<'a, T> {
    /// A `per_page` of zero is treated as one
    pub fn new(items: &'a [T], per_page: usize) -> Self {
        Self {
            items,
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty list still has one (empty) page
    pub fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.per_page).max(1)
    }

    /// Slice out 1-based `page`. Pages past the end are empty; page 0 is page 1.
    pub fn page(&self, page: usize) -> Page<'a, T> {
        let page = page.max(1);
        let total = self.items.len();
        let start = (page - 1).saturating_mul(self.per_page).min(total);
        let end = start.saturating_add(self.per_page).min(total);

        Page {
            posts: &self.items[start..end],
            pagination: Pagination {
                current_page: page,
                posts_per_page: self.per_page,
                total_posts: total,
                total_pages: self.page_count(),
                has_next_page: page.saturating_mul(self.per_page) < total,
                has_prev_page: page > 1,
            },
        }
    }

    /// Every page from 1 to `page_count()`
    pub fn pages(&self) -> impl Iterator<Item = Page<'a, T>> + '_ {
        (1..=self.page_count()).map(move |n| self.page(n))
    }
}
