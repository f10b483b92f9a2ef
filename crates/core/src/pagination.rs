//! Page/limit pagination shared by every listing.

/// A requested page. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 50;
    pub const MAX_PAGE: u64 = 100_000;

    /// Build a request, falling back to defaults and clamping to the
    /// accepted range.
    #[must_use]
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, Self::MAX_PAGE),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the size of the whole filtered set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            request,
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.request.page.saturating_mul(self.request.limit) < self.total
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.request.offset() > 0
    }

    /// Transform the items, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let req = PageRequest::new(None, None);
        assert_eq!((req.page, req.limit), (1, 10));

        let req = PageRequest::new(Some(0), Some(500));
        assert_eq!((req.page, req.limit), (1, 50));
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_next_and_prev() {
        let first = Page::new(vec![1, 2], 5, PageRequest::new(Some(1), Some(2)));
        assert!(first.has_next());
        assert!(!first.has_prev());

        let last = Page::new(vec![5], 5, PageRequest::new(Some(3), Some(2)));
        assert!(!last.has_next());
        assert!(last.has_prev());
    }

    #[test]
    fn test_huge_page_is_bounded() {
        let req = PageRequest::new(Some(u64::MAX), Some(10));
        assert_eq!(req.page, PageRequest::MAX_PAGE);
        assert_eq!(req.offset(), 999_990);

        let raw = PageRequest {
            page: u64::MAX,
            limit: 50,
        };
        assert_eq!(raw.offset(), u64::MAX);
        let page: Page<u8> = Page::new(vec![], 3, raw);
        assert!(!page.has_next());
        assert!(page.has_prev());
    }
}
