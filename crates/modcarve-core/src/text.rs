//! Text spans and edit application.
//!
//! Spans are byte offsets into a single in-memory buffer. Every pass that
//! changes text first collects `TextEdit`s against the original buffer and
//! then applies them in one batch, so offsets never go stale mid-pass.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into a source buffer.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Extract the spanned text from a buffer.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Edits
// ============================================================================

/// A single replacement of a span with new text.
///
/// An empty `replacement` deletes the span; an empty span inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    /// Replace `span` with `replacement`.
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        TextEdit {
            span,
            replacement: replacement.into(),
        }
    }

    /// Delete `span`.
    pub fn delete(span: Span) -> Self {
        TextEdit {
            span,
            replacement: String::new(),
        }
    }
}

/// Apply a batch of non-overlapping edits to a buffer.
///
/// Edits are sorted by start offset and applied in reverse order so earlier
/// offsets stay valid while later spans are spliced. Callers must ensure the
/// spans do not overlap; passes built on this module guarantee that by
/// construction.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.end));
    debug_assert!(
        sorted.windows(2).all(|w| !w[0].span.overlaps(&w[1].span)),
        "overlapping edits"
    );

    let mut result = text.to_string();
    for edit in sorted.iter().rev() {
        result.replace_range(edit.span.start..edit.span.end, &edit.replacement);
    }
    result
}

// ============================================================================
// Line Lookup
// ============================================================================

/// 1-based line number containing a byte offset.
///
/// Offsets at or past the end of the buffer report the last line.
pub fn line_of(text: &str, offset: usize) -> u32 {
    let clamped = offset.min(text.len());
    let newlines = text[..clamped].bytes().filter(|&b| b == b'\n').count();
    newlines as u32 + 1
}

// ============================================================================
// Tests
// ============================================================================
