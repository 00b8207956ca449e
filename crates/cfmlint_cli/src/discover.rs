//! CFML file discovery.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use miette::{IntoDiagnostic, Result, miette};
use tracing::info;
use walkdir::WalkDir;

/// Extensions treated as CFML sources during directory walks.
const CFML_EXTENSIONS: &[&str] = &["cfm", "cfc", "cfml"];

pub struct FileFinder {
    include_globs: Option<GlobSet>,
    exclude_globs: Option<GlobSet>,
}

impl FileFinder {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include_globs: build_globset(include)?,
            exclude_globs: build_globset(exclude)?,
        })
    }

    /// Whether a path is filtered out by the include/exclude patterns.
    fn should_ignore(&self, path: &Path) -> bool {
        if self
            .exclude_globs
            .as_ref()
            .is_some_and(|excludes| excludes.is_match(path))
        {
            return true;
        }

        if self
            .include_globs
            .as_ref()
            .is_some_and(|includes| !includes.is_match(path))
        {
            return true;
        }

        false
    }

    /// Expands file and directory arguments into a sorted, deduplicated
    /// list of CFML files.
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            if path.is_file() {
                // Explicit file arguments bypass the extension filter but
                // still honor excludes.
                let abs = path.canonicalize().into_diagnostic()?;
                if !self.should_ignore(&abs) {
                    files.push(abs);
                }
            } else if path.is_dir() {
                for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                    let entry_path = entry.path();
                    if !entry_path.is_file() || !has_cfml_extension(entry_path) {
                        continue;
                    }
                    if self.should_ignore(entry_path) {
                        continue;
                    }
                    if let Ok(abs) = entry_path.canonicalize() {
                        files.push(abs);
                    }
                }
            } else {
                return Err(miette!("path does not exist: {}", path.display()));
            }
        }

        files.sort();
        files.dedup();

        info!(files = files.len(), "discovered CFML files");
        Ok(files)
    }
}

fn has_cfml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            CFML_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|e| miette!("invalid glob pattern '{}': {}", pattern, e))?;
        builder.add(glob);
    }

    let globset = builder
        .build()
        .map_err(|e| miette!("failed to build globset: {}", e))?;
    Ok(Some(globset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x\n").unwrap();
    }

    #[test]
    fn test_directory_walk_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.cfm"));
        touch(&dir.path().join("b.CFC"));
        touch(&dir.path().join("notes.txt"));

        let finder = FileFinder::new(&[], &[]).unwrap();
        let files = finder.discover(&[dir.path().to_path_buf()]).unwrap();

        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_exclude_globs_apply() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("keep.cfm"));
        touch(&dir.path().join("vendor/skip.cfm"));

        let finder = FileFinder::new(&[], &["**/vendor/**".to_string()]).unwrap();
        let files = finder.discover(&[dir.path().to_path_buf()]).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.cfm"));
    }

    #[test]
    fn test_explicit_file_bypasses_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("template.inc");
        touch(&odd);

        let finder = FileFinder::new(&[], &[]).unwrap();
        let files = finder.discover(&[odd.clone()]).unwrap();

        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let finder = FileFinder::new(&[], &[]).unwrap();
        let result = finder.discover(&[PathBuf::from("/does/not/exist")]);
        assert!(result.is_err());
    }
}
