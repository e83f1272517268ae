pub trait RowHeight {
    fn row_height(&self) -> i32;
}

impl RowHeight for i32 {
    fn row_height(&self) -> i32 {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBudget {
    pub max_page_height: i32,
    pub header_height: i32,
    pub table_header_height: i32,
    pub padding: i32,
}

impl PageBudget {
    // Never below one pixel so a degenerate budget still makes progress.
    pub fn data_height(&self) -> i32 {
        let budget =
            self.max_page_height - self.header_height - self.table_header_height - self.padding;
        budget.max(1)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, R> {
    pub start_index: usize,
    pub rows: &'a [R],
}

impl<R: RowHeight> Page<'_, R> {
    pub fn content_height(&self) -> i32 {
        self.rows.iter().map(RowHeight::row_height).sum()
    }
}

/// Splits `rows` greedily into pages whose summed row height fits the data
/// budget. Rows are never split; a row taller than the budget gets a page of
/// its own. Empty input gives one empty page.
pub fn paginate<R: RowHeight>(rows: &[R], budget: PageBudget) -> Vec<Page<'_, R>> {
    let max_data = budget.data_height();
    let mut pages = Vec::new();
    let mut start = 0usize;
    let mut current = 0i32;

    for (idx, row) in rows.iter().enumerate() {
        let height = row.row_height().max(0);
        if idx > start && current + height > max_data {
            pages.push(Page {
                start_index: start,
                rows: &rows[start..idx],
            });
            start = idx;
            current = 0;
        }
        current += height;
    }
    if start < rows.len() || pages.is_empty() {
        pages.push(Page {
            start_index: start,
            rows: &rows[start..],
        });
    }
    pages
}
