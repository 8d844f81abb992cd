use std::ops::Range;

/// One-based pagination over a list of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    total_items: usize,
    page_size: usize,
}

impl Pagination {
    pub fn new(total_items: usize, page_size: usize) -> Self {
        Self {
            total_items,
            page_size: page_size.max(1),
        }
    }

    /// Always at least one page, even for an empty list.
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size).max(1)
    }

    pub fn clamp(&self, page: usize) -> usize {
        page.clamp(1, self.total_pages())
    }

    pub fn range(&self, page: usize) -> Range<usize> {
        let page = self.clamp(page);
        let start = ((page - 1) * self.page_size).min(self.total_items);
        let end = (start + self.page_size).min(self.total_items);
        start..end
    }

    pub fn page<'a, T>(&self, items: &'a [T], page: usize) -> &'a [T] {
        let range = self.range(page);
        &items[range.start.min(items.len())..range.end.min(items.len())]
    }

    pub fn page_sizes(&self) -> Vec<usize> {
        (1..=self.total_pages()).map(|p| self.range(p).len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirteen_items_in_pages_of_six() {
        let p = Pagination::new(13, 6);
        assert_eq!(p.total_pages(), 3);
        assert_eq!(p.page_sizes(), vec![6, 6, 1]);
    }

    #[test]
    fn test_out_of_range_pages_are_clamped() {
        let p = Pagination::new(13, 6);
        assert_eq!(p.clamp(0), 1);
        assert_eq!(p.clamp(4), 3);
        assert_eq!(p.range(0), 0..6);
        assert_eq!(p.range(4), 12..13);
    }

    #[test]
    fn test_empty_list_has_one_empty_page() {
        let p = Pagination::new(0, 6);
        assert_eq!(p.total_pages(), 1);
        assert_eq!(p.range(1), 0..0);
        let items: [u8; 0] = [];
        assert!(p.page(&items, 1).is_empty());
    }

    #[test]
    fn test_page_slices_items() {
        let items: Vec<u32> = (1..=13).collect();
        let p = Pagination::new(items.len(), 6);
        assert_eq!(p.page(&items, 2), &[7, 8, 9, 10, 11, 12]);
        assert_eq!(p.page(&items, 3), &[13]);
    }

    #[test]
    fn test_zero_page_size_is_treated_as_one() {
        let p = Pagination::new(3, 0);
        assert_eq!(p.total_pages(), 3);
    }
}
