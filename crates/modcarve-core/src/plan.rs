//! The split plan: what to carve, where it lands, what gets renamed.
//!
//! A plan is a single JSON value loaded from the workspace (default
//! `modcarve.json`) and threaded explicitly through every pass. It names the
//! ordered source files, the module directory, the residual module, the
//! signature-to-module map, per-module export lists, and the namespace
//! vocabularies for the rewrite pass.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CarveError, CarveResult};

/// Default plan file name, resolved relative to the workspace root.
pub const DEFAULT_PLAN_FILE: &str = "modcarve.json";

// ============================================================================
// Plan Types
// ============================================================================

/// Kind of top-level declaration a signature matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    /// `function name(...) { ... }`
    Function,
    /// `class name ... { ... }`
    Class,
    /// `const name = { ... };`
    #[serde(rename = "const")]
    ConstObject,
}

impl DeclKind {
    /// The leading keyword as it appears in source.
    pub fn keyword(&self) -> &'static str {
        match self {
            DeclKind::Function => "function",
            DeclKind::Class => "class",
            DeclKind::ConstObject => "const",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A top-level declaration to extract: kind plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub kind: DeclKind,
    pub name: String,
}

impl Signature {
    pub fn new(kind: DeclKind, name: impl Into<String>) -> Self {
        Signature {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// One destination module: its file name, the signatures extracted into it,
/// and any names it exports without extraction (hand-written modules).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// File name within the module directory (flat, no path separators).
    pub file: String,
    /// Signatures carved out of the sources into this module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extract: Vec<Signature>,
    /// Names this module exports beyond the extracted ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,
}

impl ModuleSpec {
    /// All names this module exports, extraction targets first.
    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.extract
            .iter()
            .map(|sig| sig.name.as_str())
            .chain(self.exports.iter().map(String::as_str))
    }
}

/// A namespace vocabulary for the rewrite pass: bare occurrences of each
/// field become `name.field`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceGroup {
    pub name: String,
    pub fields: Vec<String>,
}

/// The whole split plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPlan {
    /// Directory (relative to the workspace root) receiving the modules.
    pub module_dir: String,
    /// Monolith source files, in concatenation order.
    pub sources: Vec<String>,
    /// Module receiving everything not extracted.
    pub residual: String,
    /// Destination modules in emission order.
    pub modules: Vec<ModuleSpec>,
    /// Namespace vocabularies for the rewrite pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<NamespaceGroup>,
}

// ============================================================================
// Loading and Validation
// ============================================================================

impl SplitPlan {
    /// Load a plan from a JSON file.
    pub fn load(path: &Path) -> CarveResult<SplitPlan> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CarveError::not_found(path.display().to_string()));
            }
            Err(err) => return Err(CarveError::io(path.display().to_string(), err)),
        };
        Self::from_json(&json)
    }

    /// Parse and validate a plan from JSON text.
    pub fn from_json(json: &str) -> CarveResult<SplitPlan> {
        let plan: SplitPlan =
            serde_json::from_str(json).map_err(|err| CarveError::invalid_plan(err.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Every signature in plan order, paired with its destination file.
    pub fn signatures(&self) -> impl Iterator<Item = (&str, &Signature)> {
        self.modules
            .iter()
            .flat_map(|m| m.extract.iter().map(move |sig| (m.file.as_str(), sig)))
    }

    /// The files the resolver, reconciler, and linter manage: every module
    /// plus the residual, in plan order.
    pub fn output_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.modules.iter().map(|m| m.file.clone()).collect();
        files.push(self.residual.clone());
        files
    }

    /// Workspace-relative path of a file inside the module directory.
    pub fn module_path(&self, file: &str) -> String {
        format!("{}/{}", self.module_dir.trim_end_matches('/'), file)
    }

    /// Where the rewritten copy of a source lands: the module directory,
    /// keeping only the base name.
    pub fn rewrite_target(&self, source: &str) -> String {
        match basename(source) {
            Some(name) => self.module_path(&name),
            None => self.module_path(source),
        }
    }

    /// Check structural invariants the passes rely on.
    pub fn validate(&self) -> CarveResult<()> {
        if self.sources.is_empty() {
            return Err(CarveError::invalid_plan("sources must not be empty"));
        }
        if self.module_dir.is_empty() {
            return Err(CarveError::invalid_plan("module_dir must not be empty"));
        }
        require_flat("residual", &self.residual)?;

        let mut seen_files: Vec<&str> = Vec::new();
        let mut seen_names: Vec<(&str, &str)> = Vec::new();
        for module in &self.modules {
            require_flat("module file", &module.file)?;
            if module.file == self.residual {
                return Err(CarveError::invalid_plan(format!(
                    "residual '{}' must not appear in modules",
                    self.residual
                )));
            }
            if seen_files.contains(&module.file.as_str()) {
                return Err(CarveError::invalid_plan(format!(
                    "duplicate module file '{}'",
                    module.file
                )));
            }
            seen_files.push(module.file.as_str());

            for name in module.export_names() {
                require_identifier(name)?;
                if let Some((owner, _)) = seen_names.iter().find(|(_, n)| *n == name) {
                    return Err(CarveError::invalid_plan(format!(
                        "name '{}' exported by both '{}' and '{}'",
                        name, owner, module.file
                    )));
                }
                seen_names.push((module.file.as_str(), name));
            }
        }

        let mut seen_basenames: Vec<(&str, String)> = Vec::new();
        for source in &self.sources {
            let base = basename(source).ok_or_else(|| {
                CarveError::invalid_plan(format!("source '{}' has no file name", source))
            })?;
            if let Some((other, _)) = seen_basenames.iter().find(|(_, b)| *b == base) {
                return Err(CarveError::invalid_plan(format!(
                    "sources '{}' and '{}' collide at '{}'",
                    other, source, base
                )));
            }
            if seen_files.contains(&base.as_str()) || base == self.residual {
                return Err(CarveError::invalid_plan(format!(
                    "source '{}' collides with output file '{}'",
                    source, base
                )));
            }
            seen_basenames.push((source.as_str(), base));
        }

        let mut seen_fields: Vec<(&str, &str)> = Vec::new();
        for group in &self.namespaces {
            require_identifier(&group.name)?;
            for field in &group.fields {
                require_identifier(field)?;
                if let Some((owner, _)) = seen_fields.iter().find(|(_, f)| *f == field.as_str()) {
                    return Err(CarveError::invalid_plan(format!(
                        "field '{}' appears in namespaces '{}' and '{}'",
                        field, owner, group.name
                    )));
                }
                seen_fields.push((group.name.as_str(), field.as_str()));
            }
        }

        Ok(())
    }
}

/// File name component of a path, as an owned string.
pub fn basename(path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

fn require_flat(what: &str, file: &str) -> CarveResult<()> {
    if file.is_empty() {
        return Err(CarveError::invalid_plan(format!(
            "{} must not be empty",
            what
        )));
    }
    if file.contains('/') || file.contains('\\') {
        return Err(CarveError::invalid_plan(format!(
            "{} '{}' must be a flat file name",
            what, file
        )));
    }
    Ok(())
}

fn require_identifier(name: &str) -> CarveResult<()> {
    let mut bytes = name.bytes();
    let valid = match bytes.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == b'_' || first == b'$')
                && bytes.all(crate::scan::is_ident_byte)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CarveError::invalid_plan(format!(
            "'{}' is not a valid identifier",
            name
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================
