//! A single virtual-line range and its real target.

use std::sync::Arc;

use crate::source::SourceFile;

/// Maps a contiguous virtual-line range of a root file onto the real file
/// that was inlined there.
///
/// Ranges built for one root file never overlap and increase monotonically
/// in discovery order.
#[derive(Debug, Clone)]
pub struct IncludeMapping {
    virtual_start: usize,
    virtual_end: usize,
    file: Arc<SourceFile>,
    target_start: usize,
    directive: String,
}

impl IncludeMapping {
    pub fn new(
        virtual_start: usize,
        virtual_end: usize,
        file: Arc<SourceFile>,
        target_start: usize,
        directive: impl Into<String>,
    ) -> Self {
        debug_assert!(virtual_start <= virtual_end);
        Self {
            virtual_start,
            virtual_end,
            file,
            target_start,
            directive: directive.into(),
        }
    }

    /// Whether `virtual_line` falls inside this mapping's range.
    pub fn contains(&self, virtual_line: usize) -> bool {
        virtual_line >= self.virtual_start && virtual_line <= self.virtual_end
    }

    /// Translates a virtual line into the target file's line number.
    pub fn target_line(&self, virtual_line: usize) -> Option<usize> {
        if !self.contains(virtual_line) {
            return None;
        }
        Some(self.target_start + (virtual_line - self.virtual_start))
    }

    pub fn virtual_start(&self) -> usize {
        self.virtual_start
    }

    pub fn virtual_end(&self) -> usize {
        self.virtual_end
    }

    /// The real file this range maps onto.
    pub fn file(&self) -> &Arc<SourceFile> {
        &self.file
    }

    /// The template text of the originating include directive.
    pub fn directive(&self) -> &str {
        &self.directive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(lines: usize) -> Arc<SourceFile> {
        let content = "x\n".repeat(lines);
        Arc::new(SourceFile::from_content(
            PathBuf::from("/tmp/inc.cfm"),
            content,
        ))
    }

    #[test]
    fn test_contains_is_inclusive() {
        let mapping = IncludeMapping::new(4, 8, file(5), 1, "inc.cfm");
        assert!(!mapping.contains(3));
        assert!(mapping.contains(4));
        assert!(mapping.contains(8));
        assert!(!mapping.contains(9));
    }

    #[test]
    fn test_target_line_offsets_from_start() {
        let mapping = IncludeMapping::new(4, 8, file(5), 1, "inc.cfm");
        assert_eq!(mapping.target_line(4), Some(1));
        assert_eq!(mapping.target_line(8), Some(5));
        assert_eq!(mapping.target_line(9), None);
    }
}
