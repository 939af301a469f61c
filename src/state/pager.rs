/// Cursor over the detail view's product list.
///
/// Previous / Next stop at the ends instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetailPager {
    index: usize,
    len: usize,
}

impl DetailPager {
    pub fn new(len: usize) -> Self {
        DetailPager { index: 0, len }
    }

    /// Index of the product on screen, `None` when the list is empty
    pub fn current(&self) -> Option<usize> {
        (self.len > 0).then_some(self.index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Move forward; returns false at the last item
    pub fn next(&mut self) -> bool {
        if self.index + 1 < self.len {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Move back; returns false at the first item
    pub fn previous(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Follow the list after it grew or shrank
    pub fn resize(&mut self, len: usize) {
        self.len = len;
        self.index = self.index.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_has_no_current() {
        let mut pager = DetailPager::new(0);
        assert_eq!(pager.current(), None);
        assert!(!pager.next());
        assert!(!pager.previous());
    }

    #[test]
    fn test_clamps_at_both_ends() {
        let mut pager = DetailPager::new(3);
        assert!(!pager.previous());
        assert!(pager.next());
        assert!(pager.next());
        assert!(!pager.next());
        assert_eq!(pager.current(), Some(2));
        assert!(pager.previous());
        assert_eq!(pager.current(), Some(1));
    }

    #[test]
    fn test_resize_clamps_index() {
        let mut pager = DetailPager::new(5);
        while pager.next() {}
        assert_eq!(pager.current(), Some(4));

        pager.resize(2);
        assert_eq!(pager.current(), Some(1));

        pager.resize(0);
        assert_eq!(pager.current(), None);

        pager.resize(4);
        assert_eq!(pager.current(), Some(0));
    }
}
