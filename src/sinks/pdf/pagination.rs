//! Page arithmetic for fixed-height pages of source lines.
//!
//! Very large inputs are bounded by the truncation rule: once a document would need
//! more than `max_pages` pages, only the first and last `retained_pages` pages worth of
//! lines are kept and everything in between is dropped without a marker.

use super::config::PDF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub lines_per_page: usize,
    pub max_pages: usize,
    pub retained_pages: usize,
}

impl From<&PDF> for Pagination {
    fn from(pdf: &PDF) -> Self {
        Pagination {
            lines_per_page: pdf.lines_per_page,
            max_pages: pdf.max_pages,
            retained_pages: pdf.retained_pages,
        }
    }
}

/// A run of at most `lines_per_page` lines, starting at `offset` in the sequence.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a> {
    pub offset: usize,
    pub lines: &'a [String],
}

impl Pagination {
    /// Number of pages needed for `line_count` lines.
    pub fn page_count(&self, line_count: usize) -> usize {
        line_count.div_ceil(self.lines_per_page)
    }

    pub fn needs_truncation(&self, line_count: usize) -> bool {
        self.page_count(line_count) > self.max_pages
    }

    /// Apply the head + tail truncation rule, returning the lines to render.
    pub fn truncate(&self, mut lines: Vec<String>) -> Vec<String> {
        if !self.needs_truncation(lines.len()) {
            return lines;
        }

        // head and tail never overlap, even for settings that skipped validation
        let keep = self
            .retained_pages
            .saturating_mul(self.lines_per_page)
            .min(lines.len() / 2);
        let tail_start = lines.len() - keep;
        log::debug!(
            "truncating {} lines to {} head and {} tail lines",
            lines.len(),
            keep,
            keep
        );
        lines.drain(keep..tail_start);
        lines
    }

    /// Split `lines` into pages.
    pub fn pages<'a>(&self, lines: &'a [String]) -> impl Iterator<Item = Page<'a>> + 'a {
        let lines_per_page = self.lines_per_page;
        lines
            .chunks(lines_per_page)
            .enumerate()
            .map(move |(i, lines)| Page {
                offset: i * lines_per_page,
                lines,
            })
    }
}
