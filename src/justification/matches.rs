use super::TextRange;

/// Which sides of an excerpt are cut off mid-text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ellipses {
    pub start: bool,
    pub end: bool,
}

impl Ellipses {
    pub const NONE: Ellipses = Ellipses {
        start: false,
        end: false,
    };
    pub const START: Ellipses = Ellipses {
        start: true,
        end: false,
    };
    pub const END: Ellipses = Ellipses {
        start: false,
        end: true,
    };
    pub const BOTH: Ellipses = Ellipses {
        start: true,
        end: true,
    };
}

/// One or more highlighted ranges inside an excerpt
///
/// Match ranges are sorted, pairwise separated by at least one character and
/// all lie inside the context range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    match_ranges: Vec<TextRange>,
    context: TextRange,
    ellipses: Ellipses,
}

impl Match {
    /// # Panics
    ///
    /// Panics if `match_ranges` is empty, unsorted, overlapping or touching,
    /// or not contained in `context`.
    pub fn new(match_ranges: Vec<TextRange>, context: TextRange, ellipses: Ellipses) -> Self {
        assert!(!match_ranges.is_empty(), "a match needs at least one range");
        for range in &match_ranges {
            assert!(
                context.contains(range),
                "match range {range} lies outside of context {context}"
            );
        }
        for pair in match_ranges.windows(2) {
            assert!(
                pair[0].end() < pair[1].start(),
                "match ranges {} and {} are unsorted, overlapping or touching",
                pair[0],
                pair[1]
            );
        }

        Self {
            match_ranges,
            context,
            ellipses,
        }
    }

    /// A bare match: context equals the range, cut off on both sides
    pub fn from_range(range: TextRange) -> Self {
        Self::new(vec![range], range, Ellipses::BOTH)
    }

    pub fn match_ranges(&self) -> &[TextRange] {
        &self.match_ranges
    }

    pub fn context(&self) -> TextRange {
        self.context
    }

    pub fn ellipses(&self) -> Ellipses {
        self.ellipses
    }

    /// Start of the first highlighted range
    pub fn first_start(&self) -> usize {
        self.match_ranges[0].start()
    }
}
