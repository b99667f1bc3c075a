//! Lexical scanning over raw source text.
//!
//! Every pass that reads source text goes through a `CodeMask`: a per-byte
//! classification into code, string literal, or comment, built in one pass
//! with a small state machine. Brace matching and identifier search consult
//! the mask so that braces and names inside `'…'`, `"…"`, `` `…` ``, `//`
//! and `/* … */` regions are invisible to them.
//!
//! Known gaps, by design: template-literal interpolation is treated as
//! literal text (its contents are never scanned), and regex literals are
//! not tracked (a brace inside one is counted as code). Identifier matching
//! stays word-boundary based rather than scope-aware.

use crate::text::Span;

// ============================================================================
// Byte Classification
// ============================================================================

/// Classification of a single source byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    /// Ordinary code, including whitespace.
    Code,
    /// Inside a string literal (delimiters included).
    Str,
    /// Inside a line or block comment (delimiters included).
    Comment,
}

/// Per-byte class and brace-depth map for one source buffer.
///
/// Depth is counted over code bytes only. An opening brace and its matching
/// close carry the same depth value; bytes between them sit one level
/// deeper. Depth 0 marks top-level code.
#[derive(Debug)]
pub struct CodeMask {
    classes: Vec<ByteClass>,
    depths: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    LineComment,
    BlockComment,
    Single,
    Double,
    Template,
}

impl CodeMask {
    /// Classify every byte of `src`.
    pub fn build(src: &str) -> CodeMask {
        let bytes = src.as_bytes();
        let mut classes = vec![ByteClass::Code; bytes.len()];
        let mut depths = vec![0u32; bytes.len()];

        let mut state = ScanState::Code;
        let mut depth: u32 = 0;
        let mut escaped = false;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            match state {
                ScanState::Code => match b {
                    b'/' if bytes.get(i + 1) == Some(&b'/') => {
                        classes[i] = ByteClass::Comment;
                        classes[i + 1] = ByteClass::Comment;
                        depths[i] = depth;
                        depths[i + 1] = depth;
                        state = ScanState::LineComment;
                        i += 2;
                        continue;
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        classes[i] = ByteClass::Comment;
                        classes[i + 1] = ByteClass::Comment;
                        depths[i] = depth;
                        depths[i + 1] = depth;
                        state = ScanState::BlockComment;
                        i += 2;
                        continue;
                    }
                    b'\'' => {
                        classes[i] = ByteClass::Str;
                        depths[i] = depth;
                        state = ScanState::Single;
                        escaped = false;
                    }
                    b'"' => {
                        classes[i] = ByteClass::Str;
                        depths[i] = depth;
                        state = ScanState::Double;
                        escaped = false;
                    }
                    b'`' => {
                        classes[i] = ByteClass::Str;
                        depths[i] = depth;
                        state = ScanState::Template;
                        escaped = false;
                    }
                    b'{' => {
                        depths[i] = depth;
                        depth = depth.saturating_add(1);
                    }
                    b'}' => {
                        depth = depth.saturating_sub(1);
                        depths[i] = depth;
                    }
                    _ => depths[i] = depth,
                },
                ScanState::LineComment => {
                    if b == b'\n' {
                        depths[i] = depth;
                        state = ScanState::Code;
                    } else {
                        classes[i] = ByteClass::Comment;
                        depths[i] = depth;
                    }
                }
                ScanState::BlockComment => {
                    classes[i] = ByteClass::Comment;
                    depths[i] = depth;
                    if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        classes[i + 1] = ByteClass::Comment;
                        depths[i + 1] = depth;
                        state = ScanState::Code;
                        i += 2;
                        continue;
                    }
                }
                ScanState::Single | ScanState::Double => {
                    // Plain strings cannot span lines; a raw newline ends the
                    // state so one unterminated literal cannot swallow the file.
                    if b == b'\n' && !escaped {
                        depths[i] = depth;
                        state = ScanState::Code;
                    } else {
                        classes[i] = ByteClass::Str;
                        depths[i] = depth;
                        let quote = if state == ScanState::Single {
                            b'\''
                        } else {
                            b'"'
                        };
                        if escaped {
                            escaped = false;
                        } else if b == b'\\' {
                            escaped = true;
                        } else if b == quote {
                            state = ScanState::Code;
                        }
                    }
                }
                ScanState::Template => {
                    classes[i] = ByteClass::Str;
                    depths[i] = depth;
                    if escaped {
                        escaped = false;
                    } else if b == b'\\' {
                        escaped = true;
                    } else if b == b'`' {
                        state = ScanState::Code;
                    }
                }
            }
            i += 1;
        }

        CodeMask { classes, depths }
    }

    /// Number of classified bytes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True when the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class of the byte at `idx`.
    pub fn class(&self, idx: usize) -> ByteClass {
        self.classes[idx]
    }

    /// True when the byte at `idx` is ordinary code.
    pub fn is_code(&self, idx: usize) -> bool {
        self.classes[idx] == ByteClass::Code
    }

    /// Brace depth at `idx` (0 = top level).
    pub fn depth(&self, idx: usize) -> u32 {
        self.depths[idx]
    }
}

// ============================================================================
// Delimiter Matching
// ============================================================================

/// Find the end of the brace block opening at `open_idx`.
///
/// `open_idx` must point at a code-class `{`. Returns the offset just past
/// the matching `}`, or `None` when the block never closes.
pub fn find_block_end(src: &str, mask: &CodeMask, open_idx: usize) -> Option<usize> {
    matching_end(src, mask, open_idx, b'{', b'}')
}

/// Find the end of the parenthesized group opening at `open_idx`.
pub fn find_paren_end(src: &str, mask: &CodeMask, open_idx: usize) -> Option<usize> {
    matching_end(src, mask, open_idx, b'(', b')')
}

fn matching_end(src: &str, mask: &CodeMask, open_idx: usize, open: u8, close: u8) -> Option<usize> {
    debug_assert_eq!(src.as_bytes().get(open_idx), Some(&open));
    let mut depth = 0usize;
    for (i, b) in src.bytes().enumerate().skip(open_idx) {
        if !mask.is_code(i) {
            continue;
        }
        if b == open {
            depth += 1;
        } else if b == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i + 1);
            }
        }
    }
    None
}

// ============================================================================
// Identifier Search
// ============================================================================

/// Keywords whose following identifier is a declaration target, not a usage.
const DECL_KEYWORDS: [&str; 5] = ["function", "class", "let", "const", "var"];

/// True for bytes that can appear in an identifier.
pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// All byte offsets where `name` occurs as a genuine usage reference.
///
/// A match counts only when it is a whole identifier in code-class text,
/// not immediately preceded by `.` or a quote, not immediately followed by
/// `:` or a quote, and not the target of a `function`/`class`/`let`/
/// `const`/`var` declaration.
pub fn usage_positions(src: &str, mask: &CodeMask, name: &str) -> Vec<usize> {
    src.match_indices(name)
        .filter(|(pos, _)| is_usage_at(src, mask, *pos, name.len()))
        .map(|(pos, _)| pos)
        .collect()
}

/// True when `name` has at least one usage reference in `src`.
pub fn has_usage(src: &str, mask: &CodeMask, name: &str) -> bool {
    src.match_indices(name)
        .any(|(pos, _)| is_usage_at(src, mask, pos, name.len()))
}

fn is_usage_at(src: &str, mask: &CodeMask, pos: usize, len: usize) -> bool {
    let bytes = src.as_bytes();
    let end = pos + len;

    // Whole identifier only.
    if pos > 0 && is_ident_byte(bytes[pos - 1]) {
        return false;
    }
    if end < bytes.len() && is_ident_byte(bytes[end]) {
        return false;
    }

    // Strings and comments are invisible.
    if !mask.is_code(pos) || !mask.is_code(end - 1) {
        return false;
    }

    // Member access (`obj.name`) and quote-adjacent positions.
    if pos > 0 && matches!(bytes[pos - 1], b'.' | b'\'' | b'"') {
        return false;
    }
    // Object keys (`name:`) and quote-adjacent positions.
    if end < bytes.len() && matches!(bytes[end], b':' | b'\'' | b'"') {
        return false;
    }

    // Declaration targets.
    !DECL_KEYWORDS.contains(&preceding_word(src, pos))
}

/// The identifier word immediately before `pos`, skipping whitespace.
///
/// Returns an empty string when the previous non-whitespace byte is not an
/// identifier byte.
fn preceding_word(src: &str, pos: usize) -> &str {
    let bytes = src.as_bytes();
    let mut end = pos;
    while end > 0 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && is_ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    &src[start..end]
}

/// The usage span starting at `pos` for a name of length `len`.
pub fn usage_span(pos: usize, len: usize) -> Span {
    Span::new(pos, pos + len)
}

// ============================================================================
// Tests
// ============================================================================
