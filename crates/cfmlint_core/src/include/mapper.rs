//! Include directive scanning and virtual-line map construction.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::include::IncludeMapping;
use crate::source::{SourceFile, SourceTree};

static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<cfinclude\s+template\s*=\s*["']([^"']+)["'][^>]*>"#)
        .expect("include directive pattern")
});

/// Extensions tried when a template path does not resolve as written.
const SOURCE_EXTENSIONS: &[&str] = &[".cfm", ".cfc", ".cfml"];

/// Walks a root file's include directives and assigns each resolved include
/// a contiguous virtual-line range, recursively.
pub struct IncludeMapper<'a> {
    tree: &'a SourceTree,
}

impl<'a> IncludeMapper<'a> {
    pub fn new(tree: &'a SourceTree) -> Self {
        Self { tree }
    }

    /// Builds the complete include map for a root file.
    ///
    /// An I/O or resolution problem in one branch leaves the map partial;
    /// the outer scan always completes.
    pub fn build_map(&self, root: &Arc<SourceFile>) -> Vec<IncludeMapping> {
        let mut mappings = Vec::new();
        let mut in_progress = Vec::new();
        self.walk(root, &mut mappings, 1, &mut in_progress);
        mappings
    }

    /// Recursive scan. `cursor` is the virtual line of the previous line;
    /// returns the cursor after this file's content.
    fn walk(
        &self,
        file: &Arc<SourceFile>,
        mappings: &mut Vec<IncludeMapping>,
        start_cursor: usize,
        in_progress: &mut Vec<PathBuf>,
    ) -> usize {
        // Recursion guard: a file already on the stack is a cycle.
        if in_progress.iter().any(|p| p == file.path()) {
            debug!(
                file = %file.name(),
                "circular include detected, skipping branch"
            );
            return start_cursor;
        }
        in_progress.push(file.path().to_path_buf());

        let mut cursor = start_cursor;
        for (index, line) in file.content().lines().enumerate() {
            let template = INCLUDE_DIRECTIVE
                .captures(line)
                .map(|caps| caps[1].to_string());

            let Some(template) = template else {
                cursor += 1;
                continue;
            };

            match self.resolve_template(file, &template) {
                Some(included) if included.line_count() > 0 => {
                    debug!(
                        line = index + 1,
                        file = %file.name(),
                        template = %template,
                        "found include directive"
                    );

                    let start = cursor + 1;
                    let end = start + included.line_count() - 1;
                    mappings.push(IncludeMapping::new(
                        start,
                        end,
                        Arc::clone(&included),
                        1,
                        &template,
                    ));

                    // Nested includes get their own ranges; the cursor still
                    // lands at the end of this include's assigned range.
                    self.walk(&included, mappings, start, in_progress);
                    cursor = end;
                }
                Some(_) => {
                    // Empty include contributes no virtual lines.
                    debug!(template = %template, "include resolves to an empty file");
                }
                None => {
                    debug!(
                        template = %template,
                        file = %file.name(),
                        "could not resolve include template"
                    );
                    cursor += 1;
                }
            }
        }

        in_progress.pop();
        cursor
    }

    /// Resolves a template path against the tree.
    ///
    /// Absolute templates resolve against the project root, relative ones
    /// against the including file's directory; unresolved paths are retried
    /// with known source extensions appended.
    fn resolve_template(&self, from: &SourceFile, template: &str) -> Option<Arc<SourceFile>> {
        let base = if let Some(rest) = template.strip_prefix('/') {
            self.tree.root().join(rest)
        } else {
            from.path().parent()?.join(template)
        };

        if let Some(file) = self.tree.lookup(&base) {
            return Some(file);
        }

        let lower = template.to_ascii_lowercase();
        for ext in SOURCE_EXTENSIONS {
            if lower.ends_with(ext) {
                continue;
            }
            let mut candidate = base.clone().into_os_string();
            candidate.push(ext);
            if let Some(file) = self.tree.lookup(Path::new(&candidate)) {
                return Some(file);
            }
        }

        None
    }
}
