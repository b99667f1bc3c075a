//! JSON response types and text rendering for CLI output.
//!
//! Every command emits one response envelope: `status` and `schema_version`
//! first, then per-stage reports, the file changes, and any findings.
//! Findings are advisory; their presence never changes `status`.
//!
//! Text output renders the same data one line per action or finding, for
//! reading in a terminal. JSON goes to stdout, logs go to stderr.

use std::fmt;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{CarveError, OutputErrorCode};

/// Schema version for all JSON output.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Findings
// ============================================================================

/// An advisory diagnostic: something worth a human look, never a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Stable finding code (`duplicate-function`, `missing-symbol`, ...).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Module file the finding applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Symbol name involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 1-based line number in the module.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Finding {
    /// Create a finding with just a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Finding {
            code: code.into(),
            message: message.into(),
            module: None,
            name: None,
            line: None,
        }
    }

    /// Attach the module file.
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Attach the symbol name.
    pub fn for_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a line number.
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "finding[{}]", self.code)?;
        if let Some(module) = &self.module {
            write!(f, " {}", module)?;
        }
        write!(f, ": {}", self.message)
    }
}

// ============================================================================
// File Changes
// ============================================================================

/// What happened to one file at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// File did not exist before.
    Created,
    /// Content replaced.
    Updated,
    /// Byte-identical content; write suppressed.
    Unchanged,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeStatus::Created => "created",
            ChangeStatus::Updated => "updated",
            ChangeStatus::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// One file's before/after state.
#[derive(Debug, Clone, Serialize)]
pub struct FileChange {
    /// Path relative to the workspace root.
    pub path: String,
    pub status: ChangeStatus,
    /// Content hash before the run (absent for created files).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_before: Option<String>,
    /// Content hash after the run.
    pub hash_after: String,
}

// ============================================================================
// Stage Reports
// ============================================================================

/// Namespace rewrite stage: one entry per source file.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteReport {
    pub files: Vec<RewrittenFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewrittenFile {
    /// Source path as configured in the plan.
    pub source: String,
    /// Rewritten copy within the module directory.
    pub target: String,
    /// Identifier occurrences qualified with a namespace.
    pub replacements: usize,
    /// Top-level declarations excised as dead.
    pub excised_declarations: usize,
}

/// Assemble stage: destination modules, residual, and skips.
#[derive(Debug, Clone, Serialize)]
pub struct AssembleReport {
    pub modules: Vec<AssembledModule>,
    pub residual: String,
    pub skipped: Vec<SkippedSignature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssembledModule {
    pub file: String,
    /// Signatures placed in this module, in extraction order.
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSignature {
    pub signature: String,
    pub reason: String,
}

/// Resolve stage: the regenerated header of every module.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub headers: Vec<HeaderReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub module: String,
    /// Rendered import statements, in emission order.
    pub imports: Vec<String>,
}

/// Reconcile stage: the imports added to each module.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub patches: Vec<ImportPatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportPatch {
    pub module: String,
    pub added: Vec<AddedImport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedImport {
    /// Source module the names come from.
    pub source: String,
    pub names: Vec<String>,
    /// True when the names were appended to an existing import line.
    pub merged: bool,
}

/// Lint stage: which files were swept.
#[derive(Debug, Clone, Serialize)]
pub struct LintReport {
    pub files: Vec<String>,
}

// ============================================================================
// Response Envelope
// ============================================================================

/// The single success envelope for every command.
///
/// Stage fields are present only for the stages that ran.
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub status: String,
    pub schema_version: String,
    pub started_at: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<RewriteReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assemble: Option<AssembleReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve: Option<ResolveReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ReconcileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintReport>,
    #[serde(rename = "files_written")]
    pub files: Vec<FileChange>,
    pub findings: Vec<Finding>,
}

impl RunResponse {
    /// A fresh, empty success envelope stamped with the current time.
    pub fn new(dry_run: bool) -> Self {
        RunResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            started_at: DateTime::<Utc>::from(std::time::SystemTime::now()).to_rfc3339(),
            dry_run,
            rewrite: None,
            assemble: None,
            resolve: None,
            reconcile: None,
            lint: None,
            files: Vec::new(),
            findings: Vec::new(),
        }
    }
}

/// Error envelope, mirroring the success envelope's leading fields.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code (also the process exit code).
    pub code: u8,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    /// Create from a CarveError.
    pub fn from_error(err: &CarveError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

impl ErrorResponse {
    pub fn from_error(err: &CarveError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Render the envelope as plain text, one line per action or finding.
pub fn render_text(response: &RunResponse) -> String {
    let mut out = String::new();

    if let Some(rewrite) = &response.rewrite {
        for file in &rewrite.files {
            out.push_str(&format!(
                "rewrite {} -> {} ({} replacements, {} declarations excised)\n",
                file.source, file.target, file.replacements, file.excised_declarations
            ));
        }
    }
    if let Some(assemble) = &response.assemble {
        for module in &assemble.modules {
            out.push_str(&format!(
                "assemble {}: {}\n",
                module.file,
                module.symbols.join(", ")
            ));
        }
        out.push_str(&format!("assemble residual: {}\n", assemble.residual));
        for skip in &assemble.skipped {
            out.push_str(&format!(
                "assemble skipped: {} ({})\n",
                skip.signature, skip.reason
            ));
        }
    }
    if let Some(resolve) = &response.resolve {
        for header in &resolve.headers {
            out.push_str(&format!(
                "resolve {}: {} import{}\n",
                header.module,
                header.imports.len(),
                if header.imports.len() == 1 { "" } else { "s" }
            ));
        }
    }
    if let Some(reconcile) = &response.reconcile {
        for patch in &reconcile.patches {
            for add in &patch.added {
                out.push_str(&format!(
                    "reconcile {}: + {{ {} }} from './{}'{}\n",
                    patch.module,
                    add.names.join(", "),
                    add.source,
                    if add.merged { " (merged)" } else { "" }
                ));
            }
        }
    }
    for finding in &response.findings {
        out.push_str(&finding.to_string());
        out.push('\n');
    }
    for change in &response.files {
        if change.status == ChangeStatus::Unchanged {
            continue;
        }
        let verb = if response.dry_run {
            "would write"
        } else {
            "write"
        };
        out.push_str(&format!("{} {} ({})\n", verb, change.path, change.status));
    }

    out
}

// ============================================================================
// Tests
// ============================================================================
