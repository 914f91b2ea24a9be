use serde::Serialize;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;
pub const MAX_PAGE: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// Out of range values are clamped instead of rejected.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + request.per_page - 1) / request.per_page
        };

        Self {
            items,
            total,
            pages,
            current_page: request.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        let page = Page::new(vec![1, 2], 41, PageRequest::new(Some(3), Some(20)));
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.total, 41);
    }

    #[test]
    fn request_is_clamped() {
        let request = PageRequest::new(Some(0), Some(1_000));
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(Some(4), Some(10)).offset(), 30);
    }

    #[test]
    fn huge_page_number_keeps_a_positive_offset() {
        let request = PageRequest::new(Some(i64::MAX), Some(MAX_PER_PAGE));
        assert_eq!(request.page, MAX_PAGE);
        assert_eq!(request.offset(), (MAX_PAGE - 1) * MAX_PER_PAGE);

        let unclamped = PageRequest {
            page: i64::MAX,
            per_page: MAX_PER_PAGE,
        };
        assert_eq!(unclamped.offset(), i64::MAX);
    }
}
