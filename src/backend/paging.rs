use crate::error::{ArchiveError, Result};
use serde::Serialize;
use std::ops::Range;

/// Whole backend pages covering the window `[start, start + count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagePlan {
    /// First page to request
    pub start_page: usize,
    /// Number of consecutive pages to request
    pub page_count: usize,
    /// Entries at the front of the first page that precede the window
    pub leading_waste: usize,
    /// Window length
    pub count: usize,
    pub page_size: usize,
}

impl PagePlan {
    pub fn new(start: usize, count: usize, page_size: usize) -> Result<Self> {
        if count == 0 {
            return Err(ArchiveError::InvalidArgument(
                "Window must contain at least one entry".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(ArchiveError::InvalidArgument(
                "Page size must be positive".to_string(),
            ));
        }

        let start_page = start / page_size;
        let leading_waste = start - page_size * start_page;
        let page_count = (count + leading_waste).div_ceil(page_size);

        Ok(Self {
            start_page,
            page_count,
            leading_waste,
            count,
            page_size,
        })
    }

    /// Page indices in request order
    pub fn pages(&self) -> Range<usize> {
        self.start_page..self.start_page + self.page_count
    }

    /// Cut the window out of the concatenated pages
    pub fn window<T>(&self, entries: Vec<T>) -> Vec<T> {
        entries
            .into_iter()
            .skip(self.leading_waste)
            .take(self.count)
            .collect()
    }
}
