//! Justifications
//!
//! A justification explains why a result showed up: excerpts of the result's
//! description around every occurrence of a search term, with the
//! occurrences highlighted, e.g.
//! `<div>...und rechts davon Neues <span style="...">Post</span>hotel...</div>`.

mod matches;
mod range;

pub use matches::{Ellipses, Match};
pub use range::TextRange;

use crate::config::JustificationConfig;
use crate::query::Query;

const SENTENCE_ENDS: [char; 3] = ['.', '?', '!'];

/// Builds highlighted excerpts; holds only rendering options
#[derive(Debug, Clone)]
pub struct JustificationBuilder {
    /// Minimum number of characters shown on each side of a match
    pub context_length: usize,
    /// Only end the context at whitespace
    pub require_whitespace: bool,
    /// Stop the context at the end of a sentence
    pub respect_hard_break: bool,
    /// Inline style of the highlighted match
    pub match_style: String,
    /// Text around a sentence end that does not end a sentence
    pub hard_break_exceptions: Vec<String>,
}

impl Default for JustificationBuilder {
    fn default() -> Self {
        Self::from(&JustificationConfig::default())
    }
}

impl From<&JustificationConfig> for JustificationBuilder {
    fn from(config: &JustificationConfig) -> Self {
        Self {
            context_length: config.context_length,
            require_whitespace: config.require_whitespace,
            respect_hard_break: config.respect_hard_break,
            match_style: config.match_style.clone(),
            hard_break_exceptions: config.hard_break_exceptions.clone(),
        }
    }
}

impl JustificationBuilder {
    /// Excerpts of `text` explaining why it matches the query's terms
    pub fn justify_query(&self, query: &Query, text: &str) -> String {
        self.justify(query.terms.as_slice(), text)
    }

    /// Excerpts of `text` around every occurrence of any term
    ///
    /// Excerpts whose contexts overlap or touch are merged into one `<div>`.
    /// Returns an empty string when there is nothing to highlight.
    pub fn justify<S: AsRef<str>>(&self, terms: &[S], text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();

        let mut matches: Vec<Match> = find_matches(terms, &chars)
            .into_iter()
            .map(|range| self.context_of(range, &chars))
            .collect();
        matches.sort_by_key(Match::first_start);

        let mut blocks: Vec<Match> = Vec::with_capacity(matches.len());
        for current in matches {
            let combined = blocks
                .last()
                .and_then(|last| Self::try_combine(last, &current));
            match combined {
                Some(combined) => {
                    if let Some(last) = blocks.last_mut() {
                        *last = combined;
                    }
                }
                None => blocks.push(current),
            }
        }

        let mut markup = String::new();
        for block in &blocks {
            self.render(&mut markup, block, &chars);
        }
        markup
    }

    /// Every occurrence of every term, unsorted across terms
    pub fn get_matches<S: AsRef<str>>(&self, terms: &[S], text: &str) -> Vec<TextRange> {
        let chars: Vec<char> = text.chars().collect();
        find_matches(terms, &chars)
    }

    /// Extend a match range by surrounding context
    pub fn add_context(&self, range: TextRange, text: &str) -> Match {
        let chars: Vec<char> = text.chars().collect();
        self.context_of(range, &chars)
    }

    /// Merge two matches whose contexts overlap or touch
    pub fn try_combine(left: &Match, right: &Match) -> Option<Match> {
        let (lc, rc) = (left.context(), right.context());
        if !lc.overlaps_or_touches(&rc) {
            return None;
        }

        let ellipses = Ellipses {
            start: if lc.start() < rc.start() {
                left.ellipses().start
            } else {
                right.ellipses().start
            },
            end: if lc.end() > rc.end() {
                left.ellipses().end
            } else {
                right.ellipses().end
            },
        };

        let mut ranges: Vec<TextRange> = left
            .match_ranges()
            .iter()
            .chain(right.match_ranges())
            .copied()
            .collect();
        ranges.sort_by_key(TextRange::start);

        let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if last.overlaps_or_touches(&range) => *last = last.union(&range),
                _ => merged.push(range),
            }
        }

        Some(Match::new(merged, lc.union(&rc), ellipses))
    }

    fn context_of(&self, range: TextRange, text: &[char]) -> Match {
        let len = text.len();
        let mut ellipses = Ellipses::BOTH;

        let match_end = range.end();
        let mut end = match_end;
        while end < len && (end < match_end + self.context_length || !self.can_break(text, end)) {
            if self.must_break(text, end) {
                // The sentence end belongs to the excerpt
                end += 1;
                ellipses.end = false;
                break;
            }
            end += 1;
        }

        let match_start = range.start();
        let left_limit = match_start.saturating_sub(self.context_length);
        let mut start = match_start;
        while start > 0 && (start > left_limit || !self.can_break(text, start - 1)) {
            if self.must_break(text, start - 1) {
                ellipses.start = false;
                while start < match_start && text[start].is_whitespace() {
                    start += 1;
                }
                break;
            }
            start -= 1;
        }

        if start == 0 {
            ellipses.start = false;
        }
        if end == len {
            ellipses.end = false;
        }

        Match::new(vec![range], TextRange::from_bounds(start, end), ellipses)
    }

    fn can_break(&self, text: &[char], index: usize) -> bool {
        !self.require_whitespace || text[index].is_whitespace()
    }

    fn must_break(&self, text: &[char], index: usize) -> bool {
        self.respect_hard_break
            && SENTENCE_ENDS.contains(&text[index])
            && !self.is_hard_break_exception(text, index)
    }

    /// True when an exception string occurs in `text` covering `index`
    fn is_hard_break_exception(&self, text: &[char], index: usize) -> bool {
        self.hard_break_exceptions.iter().any(|exception| {
            let exception: Vec<char> = exception.chars().collect();
            exception.iter().enumerate().any(|(offset, &c)| {
                c == text[index]
                    && index >= offset
                    && text.get(index - offset..index - offset + exception.len())
                        == Some(exception.as_slice())
            })
        })
    }

    fn render(&self, out: &mut String, block: &Match, text: &[char]) {
        let slice = |from: usize, to: usize| html_escape(&text[from..to].iter().collect::<String>());
        let ranges = block.match_ranges();
        let context = block.context();

        out.push_str("<div>");
        if block.ellipses().start {
            out.push_str("...");
        }
        out.push_str(&slice(context.start(), ranges[0].start()));

        for (i, range) in ranges.iter().enumerate() {
            out.push_str(&format!("<span style=\"{}\">", html_escape(&self.match_style)));
            out.push_str(&slice(range.start(), range.end()));
            out.push_str("</span>");

            let next = ranges.get(i + 1).map_or(context.end(), TextRange::start);
            out.push_str(&slice(range.end(), next));
        }

        if block.ellipses().end {
            out.push_str("...");
        }
        out.push_str("</div>");
    }
}

/// Start indices of every case-insensitive occurrence, overlaps included
pub fn index_of_all(term: &str, text: &str) -> Vec<usize> {
    let term: Vec<char> = term.chars().collect();
    let text: Vec<char> = text.chars().collect();
    occurrences(&term, &text)
}

fn find_matches<S: AsRef<str>>(terms: &[S], text: &[char]) -> Vec<TextRange> {
    let mut result = Vec::new();
    for term in terms {
        let term: Vec<char> = term.as_ref().chars().collect();
        if term.is_empty() {
            continue;
        }
        for start in occurrences(&term, text) {
            result.push(TextRange::new(start, term.len()));
        }
    }
    result
}

fn occurrences(term: &[char], text: &[char]) -> Vec<usize> {
    if term.is_empty() || term.len() > text.len() {
        return Vec::new();
    }

    (0..=text.len() - term.len())
        .filter(|&start| {
            term.iter()
                .zip(&text[start..])
                .all(|(a, b)| chars_equal_ignore_case(*a, *b))
        })
        .collect()
}

fn chars_equal_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
