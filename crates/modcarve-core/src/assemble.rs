//! Module assembly: carve planned declarations out of the sources and
//! group them into their destination files.
//!
//! The sources are concatenated into one working buffer, then every planned
//! signature is extracted in plan order. Whatever the plan does not claim
//! stays in the buffer and becomes the residual module. Extracted blocks are
//! exported from their new homes.

use tracing::{debug, warn};

use crate::error::CarveResult;
use crate::extract::{extract_symbol, ExtractOutcome};
use crate::plan::SplitPlan;
use crate::report::{AssembleReport, AssembledModule, SkippedSignature};

/// Assembled module contents, ready to commit.
#[derive(Debug)]
pub struct Assembly {
    /// `(module file, content)` for every module with extractions, in plan
    /// order. Export-only modules are not materialized.
    pub modules: Vec<(String, String)>,
    /// The working buffer after every extraction, markers included.
    pub residual: String,
    pub report: AssembleReport,
}

/// Split the concatenated sources according to the plan.
pub fn assemble(plan: &SplitPlan, source_texts: &[&str]) -> CarveResult<Assembly> {
    let mut buffer = String::new();
    for text in source_texts {
        if text.is_empty() {
            continue;
        }
        buffer.push_str(text);
        if !buffer.ends_with('\n') {
            buffer.push('\n');
        }
    }

    let mut modules = Vec::new();
    let mut module_reports = Vec::new();
    let mut skipped = Vec::new();

    for spec in &plan.modules {
        if spec.extract.is_empty() {
            continue;
        }
        let mut blocks = Vec::new();
        let mut symbols = Vec::new();
        for sig in &spec.extract {
            match extract_symbol(&mut buffer, sig)? {
                ExtractOutcome::Extracted(extraction) => {
                    symbols.push(extraction.signature.to_string());
                    blocks.push(format!("export {}", extraction.text));
                }
                ExtractOutcome::Skipped(reason) => {
                    warn!(signature = %sig, reason = reason.as_str(), "skipping extraction");
                    skipped.push(SkippedSignature {
                        signature: sig.to_string(),
                        reason: reason.as_str().to_string(),
                    });
                }
            }
        }
        let content = if blocks.is_empty() {
            String::new()
        } else {
            format!("{}\n", blocks.join("\n\n"))
        };
        debug!(file = spec.file, symbols = symbols.len(), "assembled module");
        module_reports.push(AssembledModule {
            file: spec.file.clone(),
            symbols,
        });
        modules.push((spec.file.clone(), content));
    }

    Ok(Assembly {
        modules,
        residual: buffer,
        report: AssembleReport {
            modules: module_reports,
            residual: plan.residual.clone(),
            skipped,
        },
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "module_dir": "js",
        "sources": ["main.js"],
        "residual": "core.js",
        "modules": [
            {
                "file": "physics.js",
                "extract": [
                    { "kind": "function", "name": "step" },
                    { "kind": "const", "name": "GRAVITY" }
                ]
            },
            {
                "file": "render.js",
                "extract": [ { "kind": "class", "name": "Renderer" } ]
            }
        ]
    }"#;

    const SOURCE: &str = "const GRAVITY = {\n  g: 9.8\n};\nfunction step(dt) {\n  apply(dt);\n}\nclass Renderer {\n  draw() {}\n}\nboot();\n";

    fn plan(json: &str) -> SplitPlan {
        SplitPlan::from_json(json).unwrap()
    }

    #[test]
    fn extracts_into_planned_modules() {
        let assembly = assemble(&plan(PLAN), &[SOURCE]).unwrap();

        assert_eq!(assembly.modules.len(), 2);
        assert_eq!(
            assembly.modules[0],
            (
                "physics.js".to_string(),
                "export function step(dt) {\n  apply(dt);\n}\n\nexport const GRAVITY = {\n  g: 9.8\n};\n"
                    .to_string()
            )
        );
        assert_eq!(
            assembly.modules[1],
            (
                "render.js".to_string(),
                "export class Renderer {\n  draw() {}\n}\n".to_string()
            )
        );
        assert!(assembly.report.skipped.is_empty());
        assert_eq!(assembly.report.modules[0].symbols, vec!["function step", "const GRAVITY"]);
    }

    #[test]
    fn residual_keeps_unplanned_code_and_markers() {
        let assembly = assemble(&plan(PLAN), &[SOURCE]).unwrap();

        assert!(assembly.residual.contains("boot();"));
        assert!(assembly.residual.contains("/* function step extracted */"));
        assert!(assembly.residual.contains("/* const GRAVITY extracted */"));
        assert!(assembly.residual.contains("/* class Renderer extracted */"));
        assert!(!assembly.residual.contains("apply(dt)"));
        assert_eq!(assembly.report.residual, "core.js");
    }

    #[test]
    fn missing_symbol_is_skipped_not_fatal() {
        let plan_json = r#"{
            "module_dir": "js",
            "sources": ["main.js"],
            "residual": "core.js",
            "modules": [
                {
                    "file": "physics.js",
                    "extract": [
                        { "kind": "function", "name": "ghost" },
                        { "kind": "function", "name": "step" }
                    ]
                }
            ]
        }"#;
        let assembly = assemble(&plan(plan_json), &[SOURCE]).unwrap();

        assert_eq!(assembly.report.skipped.len(), 1);
        assert_eq!(assembly.report.skipped[0].signature, "function ghost");
        assert_eq!(assembly.report.skipped[0].reason, "not found");
        assert!(assembly.modules[0].1.contains("export function step"));
    }

    #[test]
    fn export_only_module_is_not_materialized() {
        let plan_json = r#"{
            "module_dir": "js",
            "sources": ["main.js"],
            "residual": "core.js",
            "modules": [
                { "file": "hand.js", "exports": ["helper"] },
                { "file": "physics.js", "extract": [ { "kind": "function", "name": "step" } ] }
            ]
        }"#;
        let assembly = assemble(&plan(plan_json), &[SOURCE]).unwrap();

        assert!(assembly.modules.iter().all(|(file, _)| file != "hand.js"));
        assert_eq!(assembly.modules.len(), 1);
    }

    #[test]
    fn sources_concatenate_in_order() {
        let plan_json = r#"{
            "module_dir": "js",
            "sources": ["a.js", "b.js"],
            "residual": "core.js",
            "modules": [
                { "file": "util.js", "extract": [ { "kind": "function", "name": "helper" } ] }
            ]
        }"#;
        let a = "first();\n";
        let b = "function helper() {\n  aid();\n}\nsecond();";
        let assembly = assemble(&plan(plan_json), &[a, b]).unwrap();

        assert!(assembly.modules[0].1.contains("aid();"));
        assert!(assembly.residual.starts_with("first();\n"));
        assert!(assembly.residual.contains("second();"));
        assert!(assembly.residual.ends_with('\n'));
    }
}
