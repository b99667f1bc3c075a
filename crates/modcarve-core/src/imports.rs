//! Import headers: parsing, usage-driven regeneration, additive repair.
//!
//! Two passes live here. The resolver owns the whole header: it strips every
//! full-line import statement, scans the remaining body for genuine usages
//! of other modules' exports, and writes a fresh header. Running it twice
//! yields the same bytes. The reconciler is the conservative counterpart: it
//! never removes or reorders anything, it only adds what is missing, merging
//! new names into an existing statement for the same source module so each
//! source keeps a single import line.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::exports::ExportTable;
use crate::report::{AddedImport, HeaderReport, ImportPatch};
use crate::scan::{self, CodeMask};

/// `import { a, b } from './module';` with optional `./` and semicolon.
static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^import\s*\{\s*([^}]*?)\s*\}\s*from\s*['"](?:\./)?([^'"]+)['"]\s*;?\s*$"#)
        .unwrap()
});

// ============================================================================
// Import Statements
// ============================================================================

/// One named-import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Source module file name, without the `./` prefix.
    pub module: String,
    pub names: Vec<String>,
}

impl ImportStatement {
    /// Render in canonical form.
    pub fn render(&self) -> String {
        format!(
            "import {{ {} }} from './{}';",
            self.names.join(", "),
            self.module
        )
    }

    /// Parse a single line. Only named imports are recognized.
    pub fn parse(line: &str) -> Option<ImportStatement> {
        let caps = IMPORT_LINE.captures(line)?;
        let names: Vec<String> = caps[1]
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        Some(ImportStatement {
            module: caps[2].to_string(),
            names,
        })
    }
}

/// An import statement found in a file, with its 0-based line index.
#[derive(Debug, Clone)]
pub struct ParsedImport {
    pub line: usize,
    pub statement: ImportStatement,
}

/// Every parseable import statement in `content`, top to bottom.
pub fn parse_import_lines(content: &str) -> Vec<ParsedImport> {
    content
        .lines()
        .enumerate()
        .filter_map(|(line, text)| {
            ImportStatement::parse(text).map(|statement| ParsedImport { line, statement })
        })
        .collect()
}

/// True for lines the resolver strips: `import` followed by whitespace at
/// line start. Indented imports are left alone.
fn is_import_line(line: &str) -> bool {
    line.strip_prefix("import")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_whitespace() || c == '{')
}

/// Remove full-line import statements and leading blank space.
pub fn strip_import_lines(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for segment in content.split_inclusive('\n') {
        let line = segment.trim_end_matches(['\n', '\r']);
        if !is_import_line(line) {
            out.push_str(segment);
        }
    }
    out.trim_start().to_string()
}

// ============================================================================
// Resolver
// ============================================================================

/// Regenerate `file`'s import header from usage.
///
/// Statements are emitted one per source module in table order, names in
/// declaration order, separated from the body by one blank line. A module
/// with no cross-module usages gets no header at all.
pub fn resolve_header(file: &str, content: &str, table: &ExportTable) -> (String, HeaderReport) {
    let body = strip_import_lines(content);
    let mask = CodeMask::build(&body);

    let mut statements = Vec::new();
    for entry in table.entries() {
        if entry.module == file {
            continue;
        }
        let used: Vec<String> = entry
            .names
            .iter()
            .filter(|name| scan::has_usage(&body, &mask, name))
            .cloned()
            .collect();
        if !used.is_empty() {
            statements.push(ImportStatement {
                module: entry.module.clone(),
                names: used,
            });
        }
    }
    debug!(module = file, imports = statements.len(), "resolved header");

    let rendered: Vec<String> = statements.iter().map(ImportStatement::render).collect();
    let new_content = if rendered.is_empty() {
        body
    } else {
        format!("{}\n\n{}", rendered.join("\n"), body)
    };

    let report = HeaderReport {
        module: file.to_string(),
        imports: rendered,
    };
    (new_content, report)
}

// ============================================================================
// Reconciler
// ============================================================================

/// Add the imports `file` uses but does not declare. Never removes.
///
/// A missing name whose source module already has an import line is merged
/// into that line; names from source modules with no line yet are prepended
/// as new statements, in table order.
pub fn reconcile_imports(file: &str, content: &str, table: &ExportTable) -> (String, ImportPatch) {
    let mask = CodeMask::build(content);
    let existing = parse_import_lines(content);

    let mut added: Vec<AddedImport> = Vec::new();
    for entry in table.entries() {
        if entry.module == file {
            continue;
        }
        let mut names = Vec::new();
        for name in &entry.names {
            let already = existing.iter().any(|pi| {
                pi.statement.module == entry.module && pi.statement.names.iter().any(|n| n == name)
            });
            if !already && scan::has_usage(content, &mask, name) {
                names.push(name.clone());
            }
        }
        if !names.is_empty() {
            added.push(AddedImport {
                source: entry.module.clone(),
                names,
                merged: false,
            });
        }
    }

    let patch = |added: Vec<AddedImport>| ImportPatch {
        module: file.to_string(),
        added,
    };

    if added.is_empty() {
        return (content.to_string(), patch(added));
    }

    let had_trailing_newline = content.ends_with('\n');
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let mut prepends: Vec<String> = Vec::new();

    for add in &mut added {
        match existing.iter().find(|pi| pi.statement.module == add.source) {
            Some(pi) => {
                let mut names = pi.statement.names.clone();
                names.extend(add.names.iter().cloned());
                lines[pi.line] = ImportStatement {
                    module: add.source.clone(),
                    names,
                }
                .render();
                add.merged = true;
            }
            None => {
                prepends.push(
                    ImportStatement {
                        module: add.source.clone(),
                        names: add.names.clone(),
                    }
                    .render(),
                );
            }
        }
        debug!(module = file, source = %add.source, names = add.names.len(), "patched imports");
    }

    let mut result = String::new();
    for line in &prepends {
        result.push_str(line);
        result.push('\n');
    }
    result.push_str(&lines.join("\n"));
    if had_trailing_newline {
        result.push('\n');
    }

    (result, patch(added))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &[&str])]) -> ExportTable {
        let files: Vec<(String, String)> = entries
            .iter()
            .map(|(module, names)| {
                let body: String = names
                    .iter()
                    .map(|n| format!("export const {} = 0;\n", n))
                    .collect();
                (module.to_string(), body)
            })
            .collect();
        let (table, dups) = ExportTable::scan(&files);
        assert!(dups.is_empty());
        table
    }

    mod statement_parsing {
        use super::*;

        #[test]
        fn parses_canonical_statement() {
            let st = ImportStatement::parse("import { a, b } from './utils.js';").unwrap();
            assert_eq!(st.module, "utils.js");
            assert_eq!(st.names, vec!["a", "b"]);
        }

        #[test]
        fn parses_tight_spacing_and_double_quotes() {
            let st = ImportStatement::parse(r#"import {a,b} from "utils.js""#).unwrap();
            assert_eq!(st.module, "utils.js");
            assert_eq!(st.names, vec!["a", "b"]);
        }

        #[test]
        fn rejects_default_import() {
            assert!(ImportStatement::parse("import State from './state.js';").is_none());
        }

        #[test]
        fn render_is_reparseable() {
            let st = ImportStatement {
                module: "state.js".to_string(),
                names: vec!["State".to_string()],
            };
            assert_eq!(st.render(), "import { State } from './state.js';");
            assert_eq!(ImportStatement::parse(&st.render()).unwrap(), st);
        }
    }

    mod stripping {
        use super::*;

        #[test]
        fn removes_header_and_leading_blank() {
            let content = "import { a } from './x.js';\nimport { b } from './y.js';\n\nbody();\n";
            assert_eq!(strip_import_lines(content), "body();\n");
        }

        #[test]
        fn indented_import_is_kept() {
            let content = "  import('lazy');\nbody();\n";
            assert_eq!(strip_import_lines(content), "import('lazy');\nbody();\n");
        }

        #[test]
        fn no_imports_is_identity_modulo_leading_blank() {
            assert_eq!(strip_import_lines("\n\nbody();\n"), "body();\n");
        }
    }

    mod resolving {
        use super::*;

        #[test]
        fn emits_one_statement_per_used_module() {
            let table = table(&[
                ("config.js", &["FPS", "DOM"][..]),
                ("state.js", &["State"][..]),
                ("utils.js", &["clamp"][..]),
            ]);
            let content = "loop(FPS);\nState.tick += 1;\n";
            let (new_content, report) = resolve_header("main.js", content, &table);
            assert_eq!(
                new_content,
                "import { FPS } from './config.js';\nimport { State } from './state.js';\n\nloop(FPS);\nState.tick += 1;\n"
            );
            assert_eq!(report.imports.len(), 2);
        }

        #[test]
        fn is_idempotent() {
            let table = table(&[("config.js", &["FPS"][..])]);
            let content = "tick(FPS);\n";
            let (once, _) = resolve_header("main.js", content, &table);
            let (twice, _) = resolve_header("main.js", &once, &table);
            assert_eq!(once, twice);
        }

        #[test]
        fn stale_import_does_not_self_perpetuate() {
            let table = table(&[("config.js", &["FPS"][..])]);
            let content = "import { FPS } from './config.js';\n\nnothingUsesIt();\n";
            let (new_content, report) = resolve_header("main.js", content, &table);
            assert_eq!(new_content, "nothingUsesIt();\n");
            assert!(report.imports.is_empty());
        }

        #[test]
        fn own_exports_are_not_imported() {
            let table = table(&[("state.js", &["State"][..])]);
            let content = "export const State = { tick: 0 };\nState.tick = 1;\n";
            let (new_content, _) = resolve_header("state.js", content, &table);
            assert!(!new_content.contains("import"));
        }

        #[test]
        fn property_and_string_mentions_do_not_import() {
            let table = table(&[("config.js", &["FPS"][..])]);
            let content = "obj.FPS = 1;\nlog('FPS');\nconst k = { FPS: 2 };\n";
            let (new_content, _) = resolve_header("main.js", content, &table);
            assert!(!new_content.contains("import"));
        }

        #[test]
        fn names_follow_declaration_order_not_alphabetical() {
            let table = table(&[("config.js", &["WORLD", "FPS"][..])]);
            let content = "go(FPS, WORLD);\n";
            let (new_content, _) = resolve_header("main.js", content, &table);
            assert!(new_content.starts_with("import { WORLD, FPS } from './config.js';"));
        }
    }

    mod reconciling {
        use super::*;

        #[test]
        fn adds_missing_import_as_new_line() {
            let table = table(&[("weapons.js", &["fireBullet"][..])]);
            let content = "fireBullet();\n";
            let (new_content, patch) = reconcile_imports("main.js", content, &table);
            assert_eq!(
                new_content,
                "import { fireBullet } from './weapons.js';\nfireBullet();\n"
            );
            assert_eq!(patch.added.len(), 1);
            assert!(!patch.added[0].merged);
        }

        #[test]
        fn merges_into_existing_line_for_same_source() {
            let table = table(&[("weapons.js", &["fireBullet", "reload"][..])]);
            let content = "import { fireBullet } from './weapons.js';\nfireBullet();\nreload();\n";
            let (new_content, patch) = reconcile_imports("main.js", content, &table);
            assert_eq!(
                new_content,
                "import { fireBullet, reload } from './weapons.js';\nfireBullet();\nreload();\n"
            );
            assert_eq!(patch.added.len(), 1);
            assert!(patch.added[0].merged);
            assert_eq!(patch.added[0].names, vec!["reload"]);
        }

        #[test]
        fn never_removes_existing_imports() {
            let table = table(&[("weapons.js", &["fireBullet"][..])]);
            let content = "import { unusedThing } from './relic.js';\nfireBullet();\n";
            let (new_content, _) = reconcile_imports("main.js", content, &table);
            assert!(new_content.contains("import { unusedThing } from './relic.js';"));
            assert!(new_content.starts_with("import { fireBullet } from './weapons.js';"));
        }

        #[test]
        fn satisfied_module_is_untouched() {
            let table = table(&[("weapons.js", &["fireBullet"][..])]);
            let content = "import { fireBullet } from './weapons.js';\nfireBullet();\n";
            let (new_content, patch) = reconcile_imports("main.js", content, &table);
            assert_eq!(new_content, content);
            assert!(patch.added.is_empty());
        }

        #[test]
        fn unused_export_is_not_added() {
            let table = table(&[("weapons.js", &["fireBullet", "reload"][..])]);
            let content = "fireBullet();\n";
            let (new_content, patch) = reconcile_imports("main.js", content, &table);
            assert_eq!(
                new_content,
                "import { fireBullet } from './weapons.js';\nfireBullet();\n"
            );
            assert_eq!(patch.added[0].names, vec!["fireBullet"]);
        }

        #[test]
        fn reconcile_then_resolve_agree_on_one_line_per_source() {
            let table = table(&[("weapons.js", &["fireBullet", "reload"][..])]);
            let content = "import { fireBullet } from './weapons.js';\nfireBullet();\nreload();\n";
            let (reconciled, _) = reconcile_imports("main.js", content, &table);
            let import_lines = reconciled
                .lines()
                .filter(|l| l.contains("weapons.js"))
                .count();
            assert_eq!(import_lines, 1);
        }
    }
}
