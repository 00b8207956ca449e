//! Cached virtual-line resolution.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::include::{IncludeMapper, IncludeMapping};
use crate::source::{SourceFile, SourceTree};

/// The real location a virtual line resolves to.
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    pub file: Arc<SourceFile>,
    pub line: usize,
    /// Whether the line came from an inlined include.
    pub included: bool,
    /// Template text of the originating directive, when `included`.
    pub directive: Option<String>,
}

/// Resolves virtual line numbers against lazily built, cached include maps.
///
/// Map construction happens under the cache lock, so concurrent queries for
/// the same root build the map at most once. Entries live until `clear()`
/// or the end of the run.
pub struct IncludeResolver {
    tree: Arc<SourceTree>,
    cache: Mutex<HashMap<PathBuf, Arc<Vec<IncludeMapping>>>>,
}

impl IncludeResolver {
    pub fn new(tree: Arc<SourceTree>) -> Self {
        Self {
            tree,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a virtual line of `root` to a real file and line.
    ///
    /// Lines within the root's own physical bounds resolve to the root
    /// without consulting the include map. Lines past every known include
    /// return `None`; the caller decides what to do with the issue.
    pub fn resolve(&self, root: &Arc<SourceFile>, virtual_line: usize) -> Option<ResolvedLocation> {
        if virtual_line >= 1 && virtual_line <= root.line_count() {
            return Some(ResolvedLocation {
                file: Arc::clone(root),
                line: virtual_line,
                included: false,
                directive: None,
            });
        }

        let mappings = self.mappings_for(root);
        for mapping in mappings.iter() {
            if let Some(line) = mapping.target_line(virtual_line) {
                debug!(
                    virtual_line,
                    root = %root.name(),
                    file = %mapping.file().name(),
                    line,
                    "resolved virtual line"
                );
                return Some(ResolvedLocation {
                    file: Arc::clone(mapping.file()),
                    line,
                    included: true,
                    directive: Some(mapping.directive().to_string()),
                });
            }
        }

        debug!(
            virtual_line,
            root = %root.name(),
            root_lines = root.line_count(),
            mappings = mappings.len(),
            "could not resolve virtual line"
        );
        None
    }

    /// Gets or builds the include map for a root file.
    pub fn mappings_for(&self, root: &Arc<SourceFile>) -> Arc<Vec<IncludeMapping>> {
        let mut cache = self.cache.lock();
        Arc::clone(
            cache
                .entry(root.path().to_path_buf())
                .or_insert_with(|| {
                    debug!(file = %root.name(), "building include map");
                    Arc::new(IncludeMapper::new(&self.tree).build_map(root))
                }),
        )
    }

    /// Drops all cached maps (for long-running hosts whose files change).
    pub fn clear(&self) {
        self.cache.lock().clear();
        debug!("include map cache cleared");
    }

    /// Number of cached maps.
    pub fn cache_size(&self) -> usize {
        self.cache.lock().len()
    }
}
