use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pageable {
    pub page: u32,
    pub per_page: u32,
}

impl Pageable {
    pub fn new(page: u32, per_page: u32) -> Self {
        Pageable { page: page.max(1), per_page: per_page.max(1) }
    }

    /// Everything on a single page.
    pub fn unpaged() -> Self {
        Pageable { page: 1, per_page: u32::MAX }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for Pageable {
    fn default() -> Self {
        Pageable::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, count: u64, pageable: Pageable) -> Self {
        let per_page = u64::from(pageable.per_page);
        let total_pages = count.div_ceil(per_page).min(u64::from(u32::MAX)) as u32;
        Page {
            data,
            count,
            page: pageable.page,
            per_page: pageable.per_page,
            total_pages,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}
