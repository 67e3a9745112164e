use serde::Serialize;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// A 1-indexed page request after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// `page < 1` becomes 1; a missing or non-positive `page_size` becomes `default_size`.
    pub fn new(page: Option<i64>, page_size: Option<i64>, default_size: u64) -> Self {
        let page = page.filter(|p| *p >= 1).map_or(1, |p| p as u64);
        let page_size = page_size
            .filter(|s| *s >= 1)
            .map_or(default_size, |s| s as u64)
            .clamp(1, MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    /// Capped at `i64::MAX`, the largest offset SQL backends bind.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.page_size)
            .min(i64::MAX as u64)
    }

    /// True when the requested page starts at or past the last of `total` rows.
    pub fn is_past(&self, total: u64) -> bool {
        self.offset() >= total
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// One page of an owner-scoped, newest-first listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
