//! Namespace rewrite: qualify bare identifiers and excise dead declarations.
//!
//! Each configured vocabulary field is rewritten from a bare identifier to
//! `Namespace.field` wherever it is a genuine usage. Top-level `let`/`var`
//! statements whose declared names all belong to the vocabulary are dead
//! after the rewrite and are excised by their tracked spans; statements
//! mixing vocabulary and foreign names are kept untouched and reported.
//!
//! The pass is idempotent: a qualified `Namespace.field` occurrence is a
//! member access and never matches again.

use std::collections::HashMap;

use tracing::debug;

use crate::plan::NamespaceGroup;
use crate::report::Finding;
use crate::scan::{self, CodeMask};
use crate::text::{self, Span, TextEdit};

/// Result of rewriting one source buffer.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub content: String,
    /// Identifier occurrences qualified with a namespace.
    pub replacements: usize,
    /// Dead declaration statements removed.
    pub excised: usize,
    pub findings: Vec<Finding>,
}

/// A parsed top-level `let`/`var` statement.
#[derive(Debug)]
struct VarStatement {
    /// Whole statement, extended to the full line where possible.
    span: Span,
    /// Declared names with their spans, in declaration order.
    names: Vec<(String, Span)>,
}

/// Rewrite `content` against the configured namespace groups.
///
/// `source_label` names the buffer in findings (the plan source path).
pub fn rewrite_namespaces(
    source_label: &str,
    content: &str,
    groups: &[NamespaceGroup],
) -> RewriteOutcome {
    if groups.is_empty() {
        return RewriteOutcome {
            content: content.to_string(),
            replacements: 0,
            excised: 0,
            findings: Vec::new(),
        };
    }

    let mask = CodeMask::build(content);
    let vocabulary: HashMap<&str, &str> = groups
        .iter()
        .flat_map(|g| g.fields.iter().map(move |f| (f.as_str(), g.name.as_str())))
        .collect();

    let mut edits: Vec<TextEdit> = Vec::new();
    let mut findings = Vec::new();
    let mut excised_spans: Vec<Span> = Vec::new();
    let mut kept_declarators: Vec<Span> = Vec::new();
    let mut excised = 0usize;

    for stmt in top_level_var_statements(content, &mask) {
        let in_vocab = stmt
            .names
            .iter()
            .filter(|(name, _)| vocabulary.contains_key(name.as_str()))
            .count();
        if in_vocab == 0 {
            continue;
        }
        if in_vocab == stmt.names.len() {
            excised_spans.push(stmt.span);
            edits.push(TextEdit::delete(stmt.span));
            excised += 1;
        } else {
            let mixed: Vec<&str> = stmt.names.iter().map(|(n, _)| n.as_str()).collect();
            findings.push(
                Finding::new(
                    "mixed-declaration",
                    format!(
                        "declaration of {} mixes namespaced and plain names; left as is",
                        mixed.join(", ")
                    ),
                )
                .in_module(source_label)
                .at_line(text::line_of(content, stmt.span.start)),
            );
            for (name, span) in &stmt.names {
                if vocabulary.contains_key(name.as_str()) {
                    kept_declarators.push(*span);
                }
            }
        }
    }

    let mut replacements = 0usize;
    for group in groups {
        for field in &group.fields {
            for pos in scan::usage_positions(content, &mask, field) {
                let span = scan::usage_span(pos, field.len());
                if excised_spans.iter().any(|ex| ex.contains(&span)) {
                    continue;
                }
                if kept_declarators.iter().any(|kd| kd.overlaps(&span)) {
                    continue;
                }
                edits.push(TextEdit::replace(span, format!("{}.{}", group.name, field)));
                replacements += 1;
            }
        }
    }

    debug!(
        source = source_label,
        replacements, excised, "namespace rewrite"
    );

    RewriteOutcome {
        content: text::apply_edits(content, &edits),
        replacements,
        excised,
        findings,
    }
}

// ============================================================================
// Statement Parsing
// ============================================================================

/// Parse every top-level `let`/`var` statement.
///
/// "Top level" means brace depth 0 and outside any parenthesized group, so
/// `for (let i = ...)` headers are never treated as statements. Anything the
/// little parser cannot follow (destructuring, missing semicolon) is left
/// alone rather than guessed at.
fn top_level_var_statements(src: &str, mask: &CodeMask) -> Vec<VarStatement> {
    let bytes = src.as_bytes();
    let mut statements = Vec::new();
    let mut paren_depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if !mask.is_code(i) {
            i += 1;
            continue;
        }
        match bytes[i] {
            b'(' => {
                paren_depth += 1;
                i += 1;
            }
            b')' => {
                paren_depth = paren_depth.saturating_sub(1);
                i += 1;
            }
            b'l' | b'v'
                if paren_depth == 0
                    && mask.depth(i) == 0
                    && is_keyword_at(src, i, &["let", "var"]) =>
            {
                let keyword_len = 3;
                match parse_statement(src, mask, i, i + keyword_len) {
                    Some(stmt) => {
                        let end = stmt.span.end;
                        statements.push(stmt);
                        i = end;
                    }
                    None => i += keyword_len,
                }
            }
            _ => i += 1,
        }
    }
    statements
}

/// True when one of `keywords` starts at `pos` as a whole word.
fn is_keyword_at(src: &str, pos: usize, keywords: &[&str]) -> bool {
    let bytes = src.as_bytes();
    if pos > 0 && scan::is_ident_byte(bytes[pos - 1]) {
        return false;
    }
    keywords.iter().any(|kw| {
        src[pos..].starts_with(kw)
            && bytes
                .get(pos + kw.len())
                .is_none_or(|&b| !scan::is_ident_byte(b))
    })
}

/// Parse declarators from just after the keyword to the closing `;`.
fn parse_statement(
    src: &str,
    mask: &CodeMask,
    keyword_start: usize,
    mut i: usize,
) -> Option<VarStatement> {
    let bytes = src.as_bytes();
    let mut names = Vec::new();

    loop {
        i = skip_whitespace(bytes, i);
        let name_start = i;
        while i < bytes.len() && scan::is_ident_byte(bytes[i]) {
            i += 1;
        }
        if i == name_start || bytes[name_start].is_ascii_digit() {
            return None;
        }
        names.push((
            src[name_start..i].to_string(),
            Span::new(name_start, i),
        ));

        i = skip_whitespace(bytes, i);
        if bytes.get(i) == Some(&b'=') {
            i = skip_initializer(src, mask, i + 1)?;
        }
        match bytes.get(i) {
            Some(b',') => i += 1,
            Some(b';') => {
                i += 1;
                break;
            }
            _ => return None,
        }
    }

    Some(VarStatement {
        span: full_line_span(src, keyword_start, i),
        names,
    })
}

/// Advance past an initializer expression, stopping before the `,` or `;`
/// that ends it at nesting depth zero.
///
/// A newline at depth zero means the statement relied on semicolon insertion;
/// those are abandoned rather than chased across lines.
fn skip_initializer(src: &str, mask: &CodeMask, mut i: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut parens = 0usize;
    let mut brackets = 0usize;
    let mut braces = 0usize;

    while i < bytes.len() {
        if !mask.is_code(i) {
            i += 1;
            continue;
        }
        let nested = parens > 0 || brackets > 0 || braces > 0;
        match bytes[i] {
            b'(' => parens += 1,
            b')' => parens = parens.checked_sub(1)?,
            b'[' => brackets += 1,
            b']' => brackets = brackets.checked_sub(1)?,
            b'{' => braces += 1,
            b'}' => braces = braces.checked_sub(1)?,
            b',' | b';' if !nested => return Some(i),
            b'\n' if !nested => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Grow a statement span to swallow its whole line when the statement is the
/// only thing on it.
fn full_line_span(src: &str, start: usize, end: usize) -> Span {
    let bytes = src.as_bytes();

    let mut line_start = start;
    while line_start > 0 && matches!(bytes[line_start - 1], b' ' | b'\t') {
        line_start -= 1;
    }
    let at_line_start = line_start == 0 || bytes[line_start - 1] == b'\n';
    if !at_line_start {
        return Span::new(start, end);
    }

    let mut line_end = end;
    while line_end < bytes.len() && matches!(bytes[line_end], b' ' | b'\t') {
        line_end += 1;
    }
    if bytes.get(line_end) == Some(&b'\n') {
        return Span::new(line_start, line_end + 1);
    }
    if line_end == bytes.len() {
        return Span::new(line_start, line_end);
    }
    Span::new(start, end)
}

// ============================================================================
// Tests
// ============================================================================
