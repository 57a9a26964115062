use serde::Serialize;
use crate::record::Record;

/// One page of records plus the numbers needed to render a pager.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub data: Vec<Record>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub last_page: usize,
    pub has_more_pages: bool,
}

impl PageMeta {
    /// `per_page` must be non-zero.
    pub fn new(total: usize, page: usize, per_page: usize) -> Self {
        let last_page = total.div_ceil(per_page).max(1);
        Self {
            total,
            page,
            per_page,
            last_page,
            has_more_pages: page < last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_total() {
        let meta = PageMeta::new(0, 1, 20);
        assert_eq!(meta.last_page, 1);
        assert!(!meta.has_more_pages);
    }

    #[test]
    fn test_partial_last_page() {
        let meta = PageMeta::new(41, 2, 20);
        assert_eq!(meta.last_page, 3);
        assert!(meta.has_more_pages);

        let meta = PageMeta::new(41, 3, 20);
        assert!(!meta.has_more_pages);
    }

    #[test]
    fn test_page_beyond_end() {
        let meta = PageMeta::new(10, 5, 10);
        assert_eq!(meta.last_page, 1);
        assert!(!meta.has_more_pages);
    }

    #[test]
    fn test_meta_json_keys() {
        let json = serde_json::to_value(PageMeta::new(3, 1, 2)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "total": 3,
                "page": 1,
                "per_page": 2,
                "last_page": 2,
                "has_more_pages": true
            })
        );
    }
}
