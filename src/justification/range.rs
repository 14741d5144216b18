use std::fmt;

/// Non-empty span of characters, `[start, start + length)`
///
/// Positions count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
    start: usize,
    length: usize,
}

impl TextRange {
    /// # Panics
    ///
    /// Panics if `length` is zero.
    pub fn new(start: usize, length: usize) -> Self {
        assert!(length > 0, "text range must not be empty (start {start})");
        Self { start, length }
    }

    /// Range covering `[start, end)`
    pub fn from_bounds(start: usize, end: usize) -> Self {
        assert!(end > start, "text range must not be empty ({start}..{end})");
        Self::new(start, end - start)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Exclusive end
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// True when the ranges share a character or are directly adjacent
    pub fn overlaps_or_touches(&self, other: &TextRange) -> bool {
        self.start <= other.end() && other.start <= self.end()
    }

    pub fn contains(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end() <= self.end()
    }

    /// Smallest range covering both
    pub fn union(&self, other: &TextRange) -> TextRange {
        TextRange::from_bounds(self.start.min(other.start), self.end().max(other.end()))
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
