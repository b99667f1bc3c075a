//! Symbol extraction: locate a top-level declaration and carve out its span.
//!
//! Extraction is destructive-but-marked: the located span is replaced in the
//! buffer by a marker comment (`/* function foo extracted */`) so the
//! residual module records what was carved where. A signature that cannot be
//! located, or whose block never returns to depth zero, is skipped and the
//! buffer is left untouched for it; skips are diagnostics, not errors.
//!
//! Matches are taken at top level only (brace depth 0, code class), so a
//! nested declaration with the same name never shadows the real target.

use regex::Regex;

use crate::error::{CarveError, CarveResult};
use crate::plan::{DeclKind, Signature};
use crate::scan::{self, CodeMask};
use crate::text::Span;

// ============================================================================
// Outcomes
// ============================================================================

/// A successfully carved declaration.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub signature: Signature,
    /// Where the declaration sat in the buffer it was carved from.
    pub span: Span,
    /// The declaration text, exactly as it appeared.
    pub text: String,
}

/// Why a signature was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The opening pattern never matched at top level.
    NotFound,
    /// The opening brace was missing or the block never closed.
    Unbalanced,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotFound => "not found",
            SkipReason::Unbalanced => "unbalanced braces",
        }
    }
}

/// Result of one extraction attempt.
#[derive(Debug)]
pub enum ExtractOutcome {
    Extracted(Extraction),
    Skipped(SkipReason),
}

// ============================================================================
// Extraction
// ============================================================================

/// The marker comment left where a declaration used to be.
pub fn marker_comment(sig: &Signature) -> String {
    format!("/* {} {} extracted */", sig.kind, sig.name)
}

/// Carve `sig` out of `buffer`, replacing it with a marker comment.
///
/// On a skip the buffer is left unchanged. Extractions are sequential by
/// design: each call rescans the current buffer, so a signature whose only
/// occurrence sat inside an already-carved block is reported as not found
/// rather than silently matched against stale text.
pub fn extract_symbol(buffer: &mut String, sig: &Signature) -> CarveResult<ExtractOutcome> {
    let mask = CodeMask::build(buffer);

    let start = match locate_opening(buffer, &mask, sig)? {
        Some(start) => start,
        None => return Ok(ExtractOutcome::Skipped(SkipReason::NotFound)),
    };

    let body_open = match find_body_open(buffer, &mask, sig, start) {
        Some(idx) => idx,
        None => return Ok(ExtractOutcome::Skipped(SkipReason::Unbalanced)),
    };

    let mut end = match scan::find_block_end(buffer, &mask, body_open) {
        Some(end) => end,
        None => return Ok(ExtractOutcome::Skipped(SkipReason::Unbalanced)),
    };

    // A const declaration owns its trailing semicolon.
    if sig.kind == DeclKind::ConstObject && buffer.as_bytes().get(end) == Some(&b';') {
        end += 1;
    }

    let span = Span::new(start, end);
    let text = span.slice(buffer).to_string();
    let marker = format!("\n{}\n", marker_comment(sig));
    buffer.replace_range(span.start..span.end, &marker);

    Ok(ExtractOutcome::Extracted(Extraction {
        signature: sig.clone(),
        span,
        text,
    }))
}

/// First top-level, code-class match of the signature's opening pattern.
fn locate_opening(src: &str, mask: &CodeMask, sig: &Signature) -> CarveResult<Option<usize>> {
    let name = regex::escape(&sig.name);
    let pattern = match sig.kind {
        DeclKind::Function => format!(r"(?:\basync\s+)?\bfunction\s+{}\s*\(", name),
        DeclKind::Class => format!(r"\bclass\s+{}\b", name),
        DeclKind::ConstObject => format!(r"\bconst\s+{}\s*=\s*\{{", name),
    };
    let re = Regex::new(&pattern)
        .map_err(|err| CarveError::internal(format!("bad opening pattern: {}", err)))?;

    let found = re
        .find_iter(src)
        .map(|m| m.start())
        .find(|&start| mask.is_code(start) && mask.depth(start) == 0);
    Ok(found)
}

/// Offset of the `{` opening the declaration body.
///
/// For functions the parameter list is skipped first, so an object default
/// in the parameters cannot be mistaken for the body.
fn find_body_open(src: &str, mask: &CodeMask, sig: &Signature, start: usize) -> Option<usize> {
    let search_from = match sig.kind {
        DeclKind::Function => {
            let paren = next_code_byte(src, mask, start, b'(')?;
            scan::find_paren_end(src, mask, paren)?
        }
        DeclKind::Class => start,
        DeclKind::ConstObject => start,
    };
    next_code_byte(src, mask, search_from, b'{')
}

fn next_code_byte(src: &str, mask: &CodeMask, from: usize, wanted: u8) -> Option<usize> {
    src.bytes()
        .enumerate()
        .skip(from)
        .find(|&(i, b)| b == wanted && mask.is_code(i))
        .map(|(i, _)| i)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(src: &str, kind: DeclKind, name: &str) -> (ExtractOutcome, String) {
        let mut buffer = src.to_string();
        let outcome = extract_symbol(&mut buffer, &Signature::new(kind, name)).unwrap();
        (outcome, buffer)
    }

    fn extracted(outcome: ExtractOutcome) -> Extraction {
        match outcome {
            ExtractOutcome::Extracted(e) => e,
            ExtractOutcome::Skipped(reason) => panic!("skipped: {}", reason.as_str()),
        }
    }

    mod function_extraction {
        use super::*;

        #[test]
        fn carves_function_and_leaves_marker() {
            let src = "before();\nfunction spawn(n) {\n  if (n > 0) { go(); }\n}\nafter();";
            let (outcome, buffer) = extract(src, DeclKind::Function, "spawn");
            let ext = extracted(outcome);
            assert!(ext.text.starts_with("function spawn"));
            assert!(ext.text.ends_with('}'));
            assert!(buffer.contains("/* function spawn extracted */"));
            assert!(!buffer.contains("if (n > 0)"));
            assert!(buffer.contains("before();"));
            assert!(buffer.contains("after();"));
        }

        #[test]
        fn object_default_in_params_does_not_end_body() {
            let src = "function init(opts = {}) {\n  run(opts);\n}\ntail();";
            let (outcome, buffer) = extract(src, DeclKind::Function, "init");
            let ext = extracted(outcome);
            assert!(ext.text.contains("run(opts);"));
            assert!(buffer.contains("tail();"));
        }

        #[test]
        fn async_prefix_is_carved_with_the_function() {
            let src = "async function load(url) {\n  return fetch(url);\n}\n";
            let (outcome, buffer) = extract(src, DeclKind::Function, "load");
            let ext = extracted(outcome);
            assert!(ext.text.starts_with("async function load"));
            assert!(!buffer.contains("async"));
        }

        #[test]
        fn keyword_tail_of_longer_identifier_is_not_an_opening() {
            let src = "superfunction spawn(1) { go(); }\n";
            let (outcome, _) = extract(src, DeclKind::Function, "spawn");
            assert!(matches!(
                outcome,
                ExtractOutcome::Skipped(SkipReason::NotFound)
            ));
        }

        #[test]
        fn nested_function_with_same_name_is_not_matched() {
            let src = "function outer() {\n  function target() { inner(); }\n}";
            let (outcome, _) = extract(src, DeclKind::Function, "target");
            assert!(matches!(
                outcome,
                ExtractOutcome::Skipped(SkipReason::NotFound)
            ));
        }

        #[test]
        fn mention_in_comment_is_not_matched() {
            let src = "// function ghost() { }\nlive();";
            let (outcome, buffer) = extract(src, DeclKind::Function, "ghost");
            assert!(matches!(
                outcome,
                ExtractOutcome::Skipped(SkipReason::NotFound)
            ));
            assert_eq!(buffer, src);
        }

        #[test]
        fn unbalanced_body_is_skipped_and_buffer_unchanged() {
            let src = "function broken() {\n  if (x) {\n";
            let (outcome, buffer) = extract(src, DeclKind::Function, "broken");
            assert!(matches!(
                outcome,
                ExtractOutcome::Skipped(SkipReason::Unbalanced)
            ));
            assert_eq!(buffer, src);
        }
    }

    mod class_extraction {
        use super::*;

        #[test]
        fn carves_class_with_extends_clause() {
            let src = "class Boss extends Enemy {\n  hit() { this.hp -= 1; }\n}\nrest();";
            let (outcome, buffer) = extract(src, DeclKind::Class, "Boss");
            let ext = extracted(outcome);
            assert!(ext.text.starts_with("class Boss extends Enemy"));
            assert!(buffer.contains("/* class Boss extracted */"));
            assert!(buffer.contains("rest();"));
        }

        #[test]
        fn class_name_prefix_is_not_matched() {
            let src = "class BossFight { }\n";
            let (outcome, _) = extract(src, DeclKind::Class, "Boss");
            assert!(matches!(
                outcome,
                ExtractOutcome::Skipped(SkipReason::NotFound)
            ));
        }
    }

    mod const_extraction {
        use super::*;

        #[test]
        fn carves_const_object_with_trailing_semicolon() {
            let src = "const AudioEngine = {\n  play() { beep(); }\n};\nnext();";
            let (outcome, buffer) = extract(src, DeclKind::ConstObject, "AudioEngine");
            let ext = extracted(outcome);
            assert!(ext.text.ends_with("};"));
            assert!(buffer.contains("/* const AudioEngine extracted */"));
            assert!(!buffer.contains("play()"));
        }

        #[test]
        fn braces_in_strings_inside_body_are_ignored() {
            let src = "const Cfg = {\n  tmpl: \"{a}\",\n  note: '}'\n};\ndone();";
            let (outcome, buffer) = extract(src, DeclKind::ConstObject, "Cfg");
            let ext = extracted(outcome);
            assert!(ext.text.contains("tmpl"));
            assert!(buffer.contains("done();"));
        }

        #[test]
        fn const_scalar_is_not_matched() {
            // Only object-literal consts are extractable by signature.
            let src = "const FPS = 60;\n";
            let (outcome, _) = extract(src, DeclKind::ConstObject, "FPS");
            assert!(matches!(
                outcome,
                ExtractOutcome::Skipped(SkipReason::NotFound)
            ));
        }
    }

    mod sequencing {
        use super::*;

        #[test]
        fn second_extraction_scans_the_carved_buffer() {
            let mut buffer =
                "function a() { helper(); }\nfunction b() { a(); }\n".to_string();
            let first = extract_symbol(&mut buffer, &Signature::new(DeclKind::Function, "a"))
                .unwrap();
            let second = extract_symbol(&mut buffer, &Signature::new(DeclKind::Function, "b"))
                .unwrap();
            assert!(matches!(first, ExtractOutcome::Extracted(_)));
            let ext = extracted(second);
            assert!(ext.text.contains("a();"));
            assert!(buffer.contains("/* function a extracted */"));
            assert!(buffer.contains("/* function b extracted */"));
        }
    }
}
