//! Workspace file access.
//!
//! Stages never touch the filesystem directly. They read and write a
//! [`SourceTree`] held in memory, and a [`SourceStore`] moves the tree to and
//! from disk in one place. Commits hash content before and after, skip byte
//! identical writes, and become a pure preview under `--dry-run`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{CarveError, CarveResult};
use crate::report::{ChangeStatus, FileChange};

/// SHA-256 of a buffer, hex encoded.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

// ============================================================================
// Source Tree
// ============================================================================

/// In-memory view of the files a run reads and writes.
///
/// Paths are workspace-relative with forward slashes. Inserts are tracked so
/// a commit only considers files some stage actually produced.
#[derive(Debug, Default)]
pub struct SourceTree {
    files: BTreeMap<String, String>,
    written: BTreeSet<String>,
}

impl SourceTree {
    pub fn new() -> Self {
        SourceTree::default()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Fetch a file that must be present.
    pub fn require(&self, path: &str) -> CarveResult<&str> {
        self.get(path).ok_or_else(|| CarveError::not_found(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Record stage output for `path`.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        self.written.insert(path.clone());
        self.files.insert(path, content.into());
    }

    /// Load a file read from disk without marking it written.
    pub fn preload(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Paths written by stages, in path order.
    pub fn written_paths(&self) -> impl Iterator<Item = &str> {
        self.written.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ============================================================================
// Source Store
// ============================================================================

/// Reads and writes workspace files under a fixed root.
#[derive(Debug, Clone)]
pub struct SourceStore {
    root: PathBuf,
}

impl SourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SourceStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    /// Read one workspace file.
    pub fn read_file(&self, path: &str) -> CarveResult<String> {
        match fs::read_to_string(self.resolve(path)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CarveError::not_found(path)),
            Err(e) => Err(CarveError::io(path, e)),
        }
    }

    /// Load the listed files into a fresh tree. Every path must exist.
    pub fn load(&self, paths: &[String]) -> CarveResult<SourceTree> {
        let mut tree = SourceTree::new();
        for path in paths {
            let content = self.read_file(path)?;
            tree.preload(path.clone(), content);
        }
        Ok(tree)
    }

    /// Write every stage-produced file back to disk.
    ///
    /// Byte-identical files are reported as unchanged and never rewritten.
    /// Under `dry_run` nothing touches disk; the returned changes describe
    /// what a real commit would have done.
    pub fn commit(&self, tree: &SourceTree, dry_run: bool) -> CarveResult<Vec<FileChange>> {
        let mut changes = Vec::new();
        for path in tree.written_paths() {
            let content = tree.require(path)?;
            let target = self.resolve(path);
            let previous = match fs::read_to_string(&target) {
                Ok(old) => Some(old),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(CarveError::io(path, e)),
            };

            let hash_after = content_hash(content);
            let hash_before = previous.as_deref().map(content_hash);
            let status = match &previous {
                Some(old) if old == content => ChangeStatus::Unchanged,
                Some(_) => ChangeStatus::Updated,
                None => ChangeStatus::Created,
            };

            if status != ChangeStatus::Unchanged && !dry_run {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| CarveError::io(path, e))?;
                }
                fs::write(&target, content).map_err(|e| CarveError::io(path, e))?;
                info!(path, status = %status, "write");
            } else {
                debug!(path, status = %status, dry_run, "no write");
            }

            changes.push(FileChange {
                path: path.to_string(),
                status,
                hash_before,
                hash_after,
            });
        }
        Ok(changes)
    }

    /// Every `.js` file under `dir`, workspace-relative, in path order.
    pub fn module_files(&self, dir: &str) -> CarveResult<Vec<String>> {
        let base = self.resolve(dir);
        if !base.is_dir() {
            return Err(CarveError::not_found(dir));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(|e| CarveError::internal(format!("walking {}: {}", dir, e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("js") {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| CarveError::internal(format!("walking {}: {}", dir, e)))?;
            files.push(rel.to_string_lossy().replace('\\', "/"));
        }
        Ok(files)
    }
}

// ============================================================================
// Tests
// ============================================================================
