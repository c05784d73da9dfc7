//! Diagnostics sink.
//!
//! A growable, single-owner collection of `{severity, span, message, hints}`
//! records, shared by every phase of the pipeline. Nothing here is ever
//! read concurrently, so there is no locking: the sink is built per-compile
//! and handed by `&mut` reference to whichever phase is currently running.
//!
//! # Formatting
//!
//! [`Diagnostics::format`] groups by file (filenames sorted), then by span
//! (line, col, end_line, end_col), and produces a deterministic string. A
//! missing span renders as `1:1`. Determinism is mandatory: the same input
//! must produce byte-identical output across runs, so grouping never
//! depends on insertion order or hashing.

use std::fmt::Write as _;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Span,
    pub message: String,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, span: Option<Span>, msg: impl Into<String>, hints: Vec<String>) {
        self.push(Severity::Error, span, msg, hints);
    }

    pub fn warn(&mut self, span: Option<Span>, msg: impl Into<String>, hints: Vec<String>) {
        self.push(Severity::Warning, span, msg, hints);
    }

    pub fn note(&mut self, span: Option<Span>, msg: impl Into<String>, hints: Vec<String>) {
        self.push(Severity::Note, span, msg, hints);
    }

    fn push(&mut self, severity: Severity, span: Option<Span>, msg: impl Into<String>, hints: Vec<String>) {
        self.entries.push(Diagnostic {
            severity,
            span: span.unwrap_or_else(Span::unknown),
            message: msg.into(),
            hints,
        });
    }

    pub fn merge(&mut self, mut other: Diagnostics) {
        self.entries.append(&mut other.entries);
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn count_errors(&self) -> usize {
        self.entries.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Reclassifies every warning as an error. Used by `--warnings-as-errors`.
    pub fn promote_warnings(&mut self) {
        for d in &mut self.entries {
            if d.severity == Severity::Warning {
                d.severity = Severity::Error;
            }
        }
    }

    /// Drops error-severity diagnostics past `max`, preserving order.
    /// Warnings and notes pass through untouched.
    pub fn truncate_errors(&mut self, max: usize) {
        let mut seen = 0usize;
        self.entries.retain(|d| {
            if d.severity != Severity::Error {
                return true;
            }
            seen += 1;
            seen <= max
        });
    }

    pub fn format(&self) -> String {
        let mut by_file: Vec<(String, Vec<&Diagnostic>)> = Vec::new();
        for d in &self.entries {
            let file = d.span.file.as_deref().unwrap_or("<unknown>").to_string();
            match by_file.iter_mut().find(|(f, _)| f == &file) {
                Some((_, v)) => v.push(d),
                None => by_file.push((file, vec![d])),
            }
        }
        by_file.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        for (file, mut diags) in by_file {
            diags.sort_by_key(|d| {
                (d.span.start_line, d.span.start_col, d.span.end_line, d.span.end_col)
            });
            let _ = writeln!(out, "{file}");
            for d in diags {
                let loc = if d.span.start_line == d.span.end_line && d.span.start_col == d.span.end_col {
                    format!("{}:{}", d.span.start_line, d.span.start_col)
                } else {
                    format!(
                        "{}:{}-{}:{}",
                        d.span.start_line, d.span.start_col, d.span.end_line, d.span.end_col
                    )
                };
                let _ = writeln!(out, "  {loc}: {}: {}", d.severity.as_str(), d.message);
                for hint in &d.hints {
                    let _ = writeln!(out, "    hint: {hint}");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_at(line: u32, col: u32) -> Span {
        Span::new(Some("a.lua".into()), line, col, line, col)
    }

    #[test]
    fn missing_span_renders_as_1_1() {
        let mut d = Diagnostics::new();
        d.error(None, "boom", vec![]);
        assert_eq!(d.format(), "<unknown>\n  1:1: error: boom\n");
    }

    #[test]
    fn groups_by_file_then_span_sorted() {
        let mut d = Diagnostics::new();
        d.error(Some(span_at(5, 1)), "second line", vec![]);
        d.warn(Some(span_at(1, 1)), "first line", vec![]);
        let out = d.format();
        let first_idx = out.find("first line").unwrap();
        let second_idx = out.find("second line").unwrap();
        assert!(first_idx < second_idx);
    }

    #[test]
    fn promote_warnings_turns_warnings_to_errors() {
        let mut d = Diagnostics::new();
        d.warn(None, "shadow", vec![]);
        assert!(!d.has_errors());
        d.promote_warnings();
        assert!(d.has_errors());
    }

    #[test]
    fn truncate_errors_keeps_warnings() {
        let mut d = Diagnostics::new();
        d.error(None, "e1", vec![]);
        d.error(None, "e2", vec![]);
        d.warn(None, "w1", vec![]);
        d.truncate_errors(1);
        assert_eq!(d.count_errors(), 1);
        assert_eq!(d.entries().len(), 2);
    }

    #[test]
    fn determinism_across_runs() {
        let mut a = Diagnostics::new();
        a.error(Some(span_at(3, 4)), "x", vec!["try y".into()]);
        a.warn(Some(span_at(1, 1)), "y", vec![]);
        let mut b = Diagnostics::new();
        b.error(Some(span_at(3, 4)), "x", vec!["try y".into()]);
        b.warn(Some(span_at(1, 1)), "y", vec![]);
        assert_eq!(a.format(), b.format());
    }
}
