//! Source spans.
//!
//! Every syntax tree node carries a [`Span`] so diagnostics can always point
//! back at source text, even after the optimizer has rewritten the tree
//! around it.

use std::rc::Rc;

/// A half-open source location: `(file, start_line, start_col, end_line, end_col)`.
///
/// Lines and columns are 1-based, matching how editors report positions.
/// `file` is `None` for synthetic spans introduced by the optimizer (hoisted
/// temporaries, cached field reads) — these never reach a diagnostic, since
/// the optimizer only runs once the checker has approved the program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: Option<Rc<str>>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(file: Option<Rc<str>>, start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self { file, start_line, start_col, end_line, end_col }
    }

    /// A span with no known location, rendered as `1:1` per the diagnostics
    /// formatting rule.
    pub fn unknown() -> Self {
        Self { file: None, start_line: 1, start_col: 1, end_line: 1, end_col: 1 }
    }

    pub fn with_file(mut self, file: Rc<str>) -> Self {
        self.file = Some(file);
        self
    }

    /// Covers the extent of both spans. Used when synthesizing a span for a
    /// compound node from its parts.
    pub fn cover(&self, other: &Span) -> Span {
        Span {
            file: self.file.clone().or_else(|| other.file.clone()),
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: other.end_line,
            end_col: other.end_col,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Span::unknown()
    }
}
