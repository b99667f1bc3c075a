//! Stage orchestration.
//!
//! Every command funnels through here. Stages read and write an in-memory
//! [`SourceTree`] and a single commit at the end moves the result to disk,
//! so chained stages always see each other's output and `--dry-run` turns
//! the commit into a pure preview without starving later stages.

use tracing::{info, warn};

use crate::assemble;
use crate::error::{CarveError, CarveResult};
use crate::exports::{DuplicateExport, ExportTable};
use crate::imports;
use crate::lint;
use crate::plan::{self, SplitPlan};
use crate::report::{
    Finding, LintReport, ReconcileReport, ResolveReport, RewriteReport, RewrittenFile,
    RunResponse,
};
use crate::rewrite;
use crate::store::{SourceStore, SourceTree};

/// One independently runnable stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rewrite,
    Assemble,
    Resolve,
    Reconcile,
    Lint,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Rewrite => "rewrite",
            Stage::Assemble => "assemble",
            Stage::Resolve => "resolve",
            Stage::Reconcile => "reconcile",
            Stage::Lint => "lint",
        }
    }
}

/// Knobs shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Report what would change without writing anything.
    pub dry_run: bool,
    /// Lint every `.js` file under the module directory instead of just the
    /// planned outputs.
    pub lint_all: bool,
}

/// Run the full split: rewrite, assemble, resolve, reconcile, then lint.
pub fn run_split(
    store: &SourceStore,
    plan: &SplitPlan,
    options: RunOptions,
) -> CarveResult<RunResponse> {
    info!(
        sources = plan.sources.len(),
        modules = plan.modules.len(),
        dry_run = options.dry_run,
        "split"
    );
    let mut cx = Cx::new(store, plan, options);
    stage_rewrite(&mut cx)?;
    stage_assemble(&mut cx)?;
    stage_resolve(&mut cx)?;
    stage_reconcile(&mut cx)?;
    stage_lint(&mut cx)?;
    cx.finish()
}

/// Run a single stage on its own.
pub fn run_stage(
    store: &SourceStore,
    plan: &SplitPlan,
    stage: Stage,
    options: RunOptions,
) -> CarveResult<RunResponse> {
    info!(stage = stage.as_str(), dry_run = options.dry_run, "run");
    let mut cx = Cx::new(store, plan, options);
    match stage {
        Stage::Rewrite => stage_rewrite(&mut cx)?,
        Stage::Assemble => stage_assemble(&mut cx)?,
        Stage::Resolve => stage_resolve(&mut cx)?,
        Stage::Reconcile => stage_reconcile(&mut cx)?,
        Stage::Lint => stage_lint(&mut cx)?,
    }
    cx.finish()
}

// ============================================================================
// Stage Context
// ============================================================================

struct Cx<'a> {
    store: &'a SourceStore,
    plan: &'a SplitPlan,
    options: RunOptions,
    tree: SourceTree,
    response: RunResponse,
}

impl<'a> Cx<'a> {
    fn new(store: &'a SourceStore, plan: &'a SplitPlan, options: RunOptions) -> Self {
        Cx {
            store,
            plan,
            options,
            tree: SourceTree::new(),
            response: RunResponse::new(options.dry_run),
        }
    }

    /// Tree first, disk second: a later stage sees what an earlier stage
    /// wrote even before anything is committed. A file that exists nowhere
    /// is skipped with a warning, not a failure.
    fn read_optional(&self, path: &str) -> CarveResult<Option<String>> {
        if let Some(content) = self.tree.get(path) {
            return Ok(Some(content.to_string()));
        }
        match self.store.read_file(path) {
            Ok(content) => Ok(Some(content)),
            Err(CarveError::NotFound { .. }) => {
                warn!(path, "missing file skipped");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn finish(mut self) -> CarveResult<RunResponse> {
        self.response.files = self.store.commit(&self.tree, self.options.dry_run)?;
        Ok(self.response)
    }
}

// ============================================================================
// Stages
// ============================================================================

fn stage_rewrite(cx: &mut Cx) -> CarveResult<()> {
    let mut files = Vec::new();
    for source in &cx.plan.sources {
        let content = match cx.read_optional(source)? {
            Some(content) => content,
            None => continue,
        };
        let outcome = rewrite::rewrite_namespaces(source, &content, &cx.plan.namespaces);
        let target = cx.plan.rewrite_target(source);
        cx.tree.insert(target.clone(), outcome.content);
        cx.response.findings.extend(outcome.findings);
        files.push(RewrittenFile {
            source: source.clone(),
            target,
            replacements: outcome.replacements,
            excised_declarations: outcome.excised,
        });
    }
    cx.response.rewrite = Some(RewriteReport { files });
    Ok(())
}

fn stage_assemble(cx: &mut Cx) -> CarveResult<()> {
    let mut texts = Vec::new();
    for source in &cx.plan.sources {
        if let Some(text) = cx.read_optional(&cx.plan.rewrite_target(source))? {
            texts.push(text);
        }
    }
    if texts.is_empty() {
        let first = cx
            .plan
            .sources
            .first()
            .map(|s| cx.plan.rewrite_target(s))
            .unwrap_or_default();
        return Err(CarveError::not_found(first));
    }
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    let assembly = assemble::assemble(cx.plan, &texts)?;

    for (file, content) in assembly.modules {
        cx.tree.insert(cx.plan.module_path(&file), content);
    }
    cx.tree
        .insert(cx.plan.module_path(&cx.plan.residual), assembly.residual);
    cx.response.assemble = Some(assembly.report);
    Ok(())
}

fn stage_resolve(cx: &mut Cx) -> CarveResult<()> {
    let table = ExportTable::from_plan(cx.plan);
    let mut headers = Vec::new();
    for file in cx.plan.output_files() {
        let path = cx.plan.module_path(&file);
        let content = match cx.read_optional(&path)? {
            Some(content) => content,
            None => continue,
        };
        let (resolved, header) = imports::resolve_header(&file, &content, &table);
        cx.tree.insert(path, resolved);
        headers.push(header);
    }
    cx.response.resolve = Some(ResolveReport { headers });
    Ok(())
}

fn stage_reconcile(cx: &mut Cx) -> CarveResult<()> {
    let mut contents = Vec::new();
    for file in cx.plan.output_files() {
        if let Some(content) = cx.read_optional(&cx.plan.module_path(&file))? {
            contents.push((file, content));
        }
    }

    let (table, duplicates) = ExportTable::scan(&contents);
    for dup in duplicates {
        cx.response.findings.push(duplicate_export_finding(dup));
    }

    let mut patches = Vec::new();
    for (file, content) in &contents {
        let (patched, patch) = imports::reconcile_imports(file, content, &table);
        if !patch.added.is_empty() {
            cx.tree.insert(cx.plan.module_path(file), patched);
        }
        patches.push(patch);
    }
    cx.response.reconcile = Some(ReconcileReport { patches });
    Ok(())
}

fn stage_lint(cx: &mut Cx) -> CarveResult<()> {
    let paths: Vec<String> = if cx.options.lint_all {
        cx.store.module_files(&cx.plan.module_dir)?
    } else {
        cx.plan
            .output_files()
            .iter()
            .map(|f| cx.plan.module_path(f))
            .collect()
    };

    let mut scanned = Vec::new();
    let mut linted = Vec::new();
    for path in paths {
        let content = match cx.read_optional(&path)? {
            Some(content) => content,
            None => continue,
        };
        cx.response.findings.extend(lint::lint_file(&path, &content));
        let label = plan::basename(&path).unwrap_or_else(|| path.clone());
        scanned.push((label, content));
        linted.push(path);
    }
    let (_, duplicates) = ExportTable::scan(&scanned);
    for dup in duplicates {
        cx.response.findings.push(duplicate_export_finding(dup));
    }

    cx.response.lint = Some(LintReport { files: linted });
    Ok(())
}

fn duplicate_export_finding(dup: DuplicateExport) -> Finding {
    let message = if dup.first == dup.second {
        format!("{} exported more than once by {}", dup.name, dup.first)
    } else {
        format!(
            "{} exported by both {} and {}; the first owner is used",
            dup.name, dup.first, dup.second
        )
    };
    Finding::new("duplicate-export", message)
        .in_module(dup.second)
        .for_name(dup.name)
}

// ============================================================================
// Tests
// ============================================================================
