//! Export table: which module owns which name.
//!
//! The resolver trusts the plan (configured extraction targets plus declared
//! extra exports). The reconciler instead derives the table from the module
//! text on disk, because by the time it runs the modules are the source of
//! truth. Both views share this type; order is module order, then name
//! order, and that order drives import emission.

use std::sync::LazyLock;

use regex::Regex;

use crate::plan::SplitPlan;
use crate::scan::CodeMask;

/// `export const|let|var|class|function <name>` at line start.
static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^export\s+(?:async\s+)?(?:const|let|var|class|function)\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .unwrap()
});

// ============================================================================
// Table
// ============================================================================

/// One module's exported names, in declaration order.
#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub module: String,
    pub names: Vec<String>,
}

/// A name claimed by two exporters; the first owner wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateExport {
    pub name: String,
    pub first: String,
    pub second: String,
}

/// Ordered module-to-names mapping.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    entries: Vec<ExportEntry>,
}

impl ExportTable {
    /// Build the table from plan configuration, in plan order.
    ///
    /// The residual module is not listed: it only ever holds what was left
    /// behind, and the plan cannot promise names for it.
    pub fn from_plan(plan: &SplitPlan) -> ExportTable {
        let entries = plan
            .modules
            .iter()
            .map(|m| ExportEntry {
                module: m.file.clone(),
                names: m.export_names().map(str::to_string).collect(),
            })
            .collect();
        ExportTable { entries }
    }

    /// Build the table by scanning module text for exported declarations.
    ///
    /// `files` is (module file, content) in sweep order. Exports inside
    /// comments are ignored. A name exported twice keeps its first owner;
    /// every duplicate is reported.
    pub fn scan(files: &[(String, String)]) -> (ExportTable, Vec<DuplicateExport>) {
        let mut table = ExportTable::default();
        let mut duplicates = Vec::new();

        for (module, content) in files {
            let mask = CodeMask::build(content);
            let mut names = Vec::new();
            for caps in EXPORT_DECL.captures_iter(content) {
                let m = match caps.get(1) {
                    Some(m) => m,
                    None => continue,
                };
                if !mask.is_code(m.start()) {
                    continue;
                }
                let name = m.as_str().to_string();
                if let Some(owner) = table.owner(&name).map(str::to_string) {
                    duplicates.push(DuplicateExport {
                        name,
                        first: owner,
                        second: module.clone(),
                    });
                } else if names.contains(&name) {
                    duplicates.push(DuplicateExport {
                        name,
                        first: module.clone(),
                        second: module.clone(),
                    });
                } else {
                    names.push(name);
                }
            }
            table.entries.push(ExportEntry {
                module: module.clone(),
                names,
            });
        }

        (table, duplicates)
    }

    /// Entries in table order.
    pub fn entries(&self) -> &[ExportEntry] {
        &self.entries
    }

    /// The module exporting `name`, if any.
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.names.iter().any(|n| n == name))
            .map(|e| e.module.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod from_plan {
        use super::*;

        #[test]
        fn lists_extraction_targets_then_extra_exports() {
            let json = r#"{
                "module_dir": "m",
                "sources": ["core.js"],
                "residual": "main.js",
                "modules": [
                    { "file": "utils.js",
                      "extract": [ { "kind": "function", "name": "clamp" } ],
                      "exports": ["EPSILON"] },
                    { "file": "state.js", "exports": ["State"] }
                ]
            }"#;
            let plan = SplitPlan::from_json(json).unwrap();
            let table = ExportTable::from_plan(&plan);
            assert_eq!(table.entries().len(), 2);
            assert_eq!(table.entries()[0].names, vec!["clamp", "EPSILON"]);
            assert_eq!(table.owner("State"), Some("state.js"));
            assert_eq!(table.owner("missing"), None);
        }
    }

    mod scanning {
        use super::*;

        fn files(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
            pairs
                .iter()
                .map(|(f, c)| (f.to_string(), c.to_string()))
                .collect()
        }

        #[test]
        fn finds_exported_declarations_in_order() {
            let files = files(&[(
                "utils.js",
                "export function clamp(x) { return x; }\nexport const EPSILON = 1e-9;\nexport class Grid { }\n",
            )]);
            let (table, dups) = ExportTable::scan(&files);
            assert!(dups.is_empty());
            assert_eq!(table.entries()[0].names, vec!["clamp", "EPSILON", "Grid"]);
        }

        #[test]
        fn non_exported_declarations_are_ignored() {
            let files = files(&[("utils.js", "function local() { }\nexport let speed = 1;\n")]);
            let (table, _) = ExportTable::scan(&files);
            assert_eq!(table.entries()[0].names, vec!["speed"]);
        }

        #[test]
        fn commented_export_is_ignored() {
            let files = files(&[(
                "utils.js",
                "/*\nexport const Ghost = 1;\n*/\nexport const Real = 2;\n",
            )]);
            let (table, dups) = ExportTable::scan(&files);
            assert!(dups.is_empty());
            assert_eq!(table.entries()[0].names, vec!["Real"]);
        }

        #[test]
        fn duplicate_across_modules_keeps_first_owner() {
            let files = files(&[
                ("a.js", "export const State = {};\n"),
                ("b.js", "export class State { }\n"),
            ]);
            let (table, dups) = ExportTable::scan(&files);
            assert_eq!(table.owner("State"), Some("a.js"));
            assert_eq!(dups.len(), 1);
            assert_eq!(dups[0].first, "a.js");
            assert_eq!(dups[0].second, "b.js");
        }

        #[test]
        fn duplicate_within_one_module_is_reported() {
            let files = files(&[(
                "a.js",
                "export const zoom = 1;\nexport function zoom() { }\n",
            )]);
            let (table, dups) = ExportTable::scan(&files);
            assert_eq!(table.entries()[0].names, vec!["zoom"]);
            assert_eq!(dups.len(), 1);
            assert_eq!(dups[0].first, "a.js");
        }

        #[test]
        fn async_function_export_is_found() {
            let files = files(&[("net.js", "export async function fetchLevel() { }\n")]);
            let (table, _) = ExportTable::scan(&files);
            assert_eq!(table.entries()[0].names, vec!["fetchLevel"]);
        }
    }
}
