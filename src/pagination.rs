/// Last pages smaller than this pull in the penultimate page eagerly, so the
/// thread never ends with a lone "load more" for one or two comments.
const SMALL_LAST_PAGE: u32 = 3;

/// Which comment pages to fetch up front and which to reveal on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pub page_count: u32,
    /// Pages fetched during the initial load, in request order.
    pub eager: Vec<u32>,
    pub hidden: HiddenPages,
}

impl PagePlan {
    pub fn new(total_comments: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let page_count = total_comments.div_ceil(page_size);

        let mut eager = Vec::with_capacity(3);
        if page_count > 0 {
            eager.push(1);
        }
        if page_count > 1 {
            eager.push(page_count);
        }
        if page_count > 2 && total_comments % page_size < SMALL_LAST_PAGE {
            eager.push(page_count - 1);
        }

        let remaining = page_count.saturating_sub(eager.len() as u32);
        Self {
            page_count,
            eager,
            hidden: HiddenPages {
                next: 2,
                remaining,
                page_size,
            },
        }
    }
}

/// Cursor over the interior pages that were not loaded eagerly.
/// Hidden pages are always a contiguous run starting at page 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiddenPages {
    next: u32,
    remaining: u32,
    page_size: u32,
}

impl HiddenPages {
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Next page to request, if any.
    pub fn peek(&self) -> Option<u32> {
        (self.remaining > 0).then_some(self.next)
    }

    /// Mark the page returned by `peek` as loaded.
    pub fn advance(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.next += 1;
        }
    }

    /// Upper bound of comments still hidden, as shown on the loader.
    pub fn hidden_items(&self) -> u32 {
        self.remaining * self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_comments_loads_nothing() {
        let plan = PagePlan::new(0, 30);
        assert_eq!(plan.page_count, 0);
        assert!(plan.eager.is_empty());
        assert!(plan.hidden.is_empty());
    }

    #[test]
    fn single_page() {
        let plan = PagePlan::new(12, 30);
        assert_eq!(plan.page_count, 1);
        assert_eq!(plan.eager, vec![1]);
        assert!(plan.hidden.is_empty());
    }

    #[test]
    fn two_pages_load_both() {
        let plan = PagePlan::new(55, 30);
        assert_eq!(plan.page_count, 2);
        assert_eq!(plan.eager, vec![1, 2]);
        assert!(plan.hidden.is_empty());
    }

    #[test]
    fn small_last_page_pulls_in_penultimate() {
        let plan = PagePlan::new(61, 30);
        assert_eq!(plan.page_count, 3);
        assert_eq!(plan.eager, vec![1, 3, 2]);
        assert_eq!(plan.hidden.remaining(), 0);
        assert_eq!(plan.hidden.peek(), None);
    }

    #[test]
    fn exact_multiple_counts_as_small_remainder() {
        // 90 % 30 == 0, so the penultimate page is eager too
        let plan = PagePlan::new(90, 30);
        assert_eq!(plan.page_count, 3);
        assert_eq!(plan.eager, vec![1, 3, 2]);
        assert!(plan.hidden.is_empty());
    }

    #[test]
    fn interior_pages_are_hidden_and_revealed_in_order() {
        let plan = PagePlan::new(95, 30);
        assert_eq!(plan.page_count, 4);
        assert_eq!(plan.eager, vec![1, 4]);

        let mut hidden = plan.hidden;
        assert_eq!(hidden.remaining(), 2);
        assert_eq!(hidden.hidden_items(), 60);
        assert_eq!(hidden.peek(), Some(2));
        hidden.advance();
        assert_eq!(hidden.peek(), Some(3));
        assert_eq!(hidden.hidden_items(), 30);
        hidden.advance();
        assert_eq!(hidden.peek(), None);
        hidden.advance();
        assert!(hidden.is_empty());
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let plan = PagePlan::new(2, 0);
        assert_eq!(plan.page_count, 2);
        assert_eq!(plan.eager, vec![1, 2]);
    }
}
