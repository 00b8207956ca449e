//! Source file handles and the indexed source tree.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::AnalyzerError;

/// An immutable handle to one source unit.
///
/// Content is read once at load time; `content()` is a zero-copy accessor.
/// The core never mutates the underlying file.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    name: String,
    content: String,
    line_count: usize,
}

impl SourceFile {
    /// Loads a file from disk. The stored path is canonicalized.
    pub fn load(path: &Path) -> Result<Arc<Self>, AnalyzerError> {
        let path = path
            .canonicalize()
            .map_err(|e| AnalyzerError::file(format!("cannot resolve {}: {}", path.display(), e)))?;
        let content = fs::read_to_string(&path)
            .map_err(|e| AnalyzerError::file(format!("failed to read {}: {}", path.display(), e)))?;
        Ok(Arc::new(Self::from_content(path, content)))
    }

    /// Builds a handle from already-loaded content.
    pub fn from_content(path: PathBuf, content: String) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let line_count = content.lines().count();
        Self {
            path,
            name,
            content,
            line_count,
        }
    }

    /// Absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name (file name component).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of physical lines.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// The file's textual content.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// The set of source files known to a run, keyed by canonical path.
///
/// Both include resolution and result import only ever see files that were
/// indexed here; paths outside the tree simply fail to resolve.
pub struct SourceTree {
    root: PathBuf,
    files: RwLock<HashMap<PathBuf, Arc<SourceFile>>>,
}

impl SourceTree {
    /// Creates an empty tree rooted at the project directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Project root used to resolve absolute include templates.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads and indexes a file, returning its handle.
    pub fn index(&self, path: &Path) -> Result<Arc<SourceFile>, AnalyzerError> {
        let file = SourceFile::load(path)?;
        self.files
            .write()
            .insert(file.path().to_path_buf(), Arc::clone(&file));
        Ok(file)
    }

    /// Indexes a pre-built handle (used by tests and synthetic trees).
    pub fn insert(&self, file: SourceFile) -> Arc<SourceFile> {
        let file = Arc::new(file);
        self.files
            .write()
            .insert(file.path().to_path_buf(), Arc::clone(&file));
        file
    }

    /// Looks up an indexed file by path.
    ///
    /// The query is canonicalized when possible so `./a.cfm` and its absolute
    /// form find the same entry; unknown paths return `None`.
    pub fn lookup(&self, path: &Path) -> Option<Arc<SourceFile>> {
        let files = self.files.read();
        if let Some(file) = files.get(path) {
            return Some(Arc::clone(file));
        }
        let canonical = path.canonicalize().ok()?;
        files.get(&canonical).map(Arc::clone)
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether the tree has no indexed files.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl std::fmt::Debug for SourceTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTree")
            .field("root", &self.root)
            .field("files", &self.files.read().len())
            .finish()
    }
}

/// Loads and indexes a set of files, logging and skipping unreadable ones.
pub fn index_files(
    tree: &SourceTree,
    paths: &[PathBuf],
) -> (Vec<Arc<SourceFile>>, Vec<(PathBuf, AnalyzerError)>) {
    let mut indexed = Vec::with_capacity(paths.len());
    let mut failed = Vec::new();

    for path in paths {
        match tree.index(path) {
            Ok(file) => indexed.push(file),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable file");
                failed.push((path.clone(), e));
            }
        }
    }

    (indexed, failed)
}
