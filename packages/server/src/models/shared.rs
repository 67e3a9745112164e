use serde::{Deserialize, Serialize};

use crate::services::{Page, PageRequest};

/// Query parameters for paged listings.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    /// Page number (1-based). Values below 1 are treated as 1.
    #[param(example = 1)]
    pub page: Option<i64>,
    /// Items per page (1-100). Missing or non-positive values use the listing's default.
    #[param(example = 10)]
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn to_request(&self, default_size: u64) -> PageRequest {
        PageRequest::new(self.page, self.page_size, default_size)
    }
}

/// One page of results plus the total count across all pages.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub page_size: u64,
    #[schema(example = 5)]
    pub total_pages: u64,
}

impl<S, T: From<S>> From<Page<S>> for PageResponse<T> {
    fn from(page: Page<S>) -> Self {
        let total_pages = page.total_pages();
        let page = page.map(T::from);
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages,
        }
    }
}
