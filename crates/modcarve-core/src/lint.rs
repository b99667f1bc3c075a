//! Advisory checks over module files.
//!
//! Linting never fails a run. Each check reports a name at most once per
//! file, no matter how many times it reoffends:
//!
//! - `duplicate-function`: a top-level function declared more than once.
//! - `duplicate-variable`: a top-level `let`/`const`/`var` name declared
//!   more than once.
//! - `duplicate-import`: the same name imported by more than one statement.
//! - `duplicate-source-import`: more than one import statement for the same
//!   source module.
//! - `import-shadowing`: an imported name redeclared locally.

use std::sync::LazyLock;

use regex::Regex;

use crate::imports;
use crate::report::Finding;
use crate::scan::CodeMask;
use crate::text;

static TOP_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?(?:async\s+)?(function|class|let|const|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)",
    )
    .unwrap()
});

/// Run every lint check against one file.
pub fn lint_file(path: &str, content: &str) -> Vec<Finding> {
    let mask = CodeMask::build(content);
    let mut findings = Vec::new();

    let mut functions: Vec<(String, Vec<u32>)> = Vec::new();
    let mut variables: Vec<(String, Vec<u32>)> = Vec::new();
    let mut declared: Vec<String> = Vec::new();

    for caps in TOP_DECL.captures_iter(content) {
        let (keyword, name) = match (caps.get(1), caps.get(2)) {
            (Some(k), Some(n)) => (k, n),
            _ => continue,
        };
        if !mask.is_code(keyword.start()) || mask.depth(keyword.start()) != 0 {
            continue;
        }
        let line = text::line_of(content, name.start());
        declared.push(name.as_str().to_string());
        match keyword.as_str() {
            "function" => record(&mut functions, name.as_str(), line),
            "let" | "const" | "var" => record(&mut variables, name.as_str(), line),
            _ => {}
        }
    }

    for (name, lines) in &functions {
        if lines.len() > 1 {
            findings.push(
                Finding::new(
                    "duplicate-function",
                    format!("function {} declared {} times at top level", name, lines.len()),
                )
                .in_module(path)
                .for_name(name)
                .at_line(lines[1]),
            );
        }
    }
    for (name, lines) in &variables {
        if lines.len() > 1 {
            findings.push(
                Finding::new(
                    "duplicate-variable",
                    format!("variable {} declared {} times at top level", name, lines.len()),
                )
                .in_module(path)
                .for_name(name)
                .at_line(lines[1]),
            );
        }
    }

    let parsed = imports::parse_import_lines(content);
    let mut imported: Vec<(String, Vec<u32>)> = Vec::new();
    let mut sources: Vec<(String, Vec<u32>)> = Vec::new();
    for import in &parsed {
        let line = import.line as u32 + 1;
        record(&mut sources, &import.statement.module, line);
        for name in &import.statement.names {
            record(&mut imported, name, line);
        }
    }

    for (name, lines) in &imported {
        if lines.len() > 1 {
            findings.push(
                Finding::new(
                    "duplicate-import",
                    format!("{} imported {} times", name, lines.len()),
                )
                .in_module(path)
                .for_name(name)
                .at_line(lines[1]),
            );
        }
    }
    for (module, lines) in &sources {
        if lines.len() > 1 {
            findings.push(
                Finding::new(
                    "duplicate-source-import",
                    format!("{} import statements from './{}'", lines.len(), module),
                )
                .in_module(path)
                .at_line(lines[1]),
            );
        }
    }
    for (name, lines) in &imported {
        if declared.iter().any(|d| d == name) {
            findings.push(
                Finding::new(
                    "import-shadowing",
                    format!("imported {} is shadowed by a local declaration", name),
                )
                .in_module(path)
                .for_name(name)
                .at_line(lines[0]),
            );
        }
    }

    findings
}

fn record(bucket: &mut Vec<(String, Vec<u32>)>, name: &str, line: u32) {
    match bucket.iter_mut().find(|(n, _)| n == name) {
        Some((_, lines)) => lines.push(line),
        None => bucket.push((name.to_string(), vec![line])),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod duplicate_declarations {
        use super::*;

        #[test]
        fn repeated_function_reported_once() {
            let src = "function tick() {}\nfunction tick() {}\nfunction tick() {}\n";
            let findings = lint_file("core.js", src);
            assert_eq!(findings.len(), 1);
            assert_eq!(findings[0].code, "duplicate-function");
            assert_eq!(findings[0].name.as_deref(), Some("tick"));
            assert_eq!(findings[0].line, Some(2));
            assert!(findings[0].message.contains("3 times"));
        }

        #[test]
        fn variable_duplicates_cross_keywords() {
            let src = "let speed = 1;\nconst speed = 2;\n";
            let findings = lint_file("core.js", src);
            assert_eq!(findings.len(), 1);
            assert_eq!(findings[0].code, "duplicate-variable");
            assert_eq!(findings[0].name.as_deref(), Some("speed"));
        }

        #[test]
        fn nested_declarations_do_not_count() {
            let src = "function outer() {\n  function tick() {}\n}\nfunction tick() {}\n";
            assert!(lint_file("core.js", src).is_empty());
        }

        #[test]
        fn commented_declaration_does_not_count() {
            let src = "// function tick() {}\nfunction tick() {}\n";
            assert!(lint_file("core.js", src).is_empty());
        }

        #[test]
        fn exported_async_functions_count() {
            let src = "export async function load() {}\nasync function load() {}\n";
            let findings = lint_file("core.js", src);
            assert_eq!(findings.len(), 1);
            assert_eq!(findings[0].code, "duplicate-function");
        }
    }

    mod import_checks {
        use super::*;

        #[test]
        fn name_imported_twice_reported_once() {
            let src = "import { clamp } from './utils.js';\nimport { clamp, lerp } from './math.js';\n";
            let findings = lint_file("core.js", src);
            let dup: Vec<_> = findings.iter().filter(|f| f.code == "duplicate-import").collect();
            assert_eq!(dup.len(), 1);
            assert_eq!(dup[0].name.as_deref(), Some("clamp"));
            assert_eq!(dup[0].line, Some(2));
        }

        #[test]
        fn two_statements_from_one_source() {
            let src = "import { clamp } from './utils.js';\nimport { lerp } from './utils.js';\n";
            let findings = lint_file("core.js", src);
            assert_eq!(findings.len(), 1);
            assert_eq!(findings[0].code, "duplicate-source-import");
            assert!(findings[0].message.contains("utils.js"));
        }

        #[test]
        fn imported_name_shadowed_by_local_declaration() {
            let src = "import { clamp } from './utils.js';\nfunction clamp(v) { return v; }\n";
            let findings = lint_file("core.js", src);
            assert_eq!(findings.len(), 1);
            assert_eq!(findings[0].code, "import-shadowing");
            assert_eq!(findings[0].name.as_deref(), Some("clamp"));
            assert_eq!(findings[0].line, Some(1));
        }

        #[test]
        fn clean_file_has_no_findings() {
            let src = "import { clamp } from './utils.js';\n\nexport function tick() {\n  return clamp(1);\n}\n";
            assert!(lint_file("core.js", src).is_empty());
        }
    }
}
