//! Pluggable content preprocessing.
//!
//! A preprocessor may rewrite a file's content before the engine sees it,
//! typically to paper over markup the engine chokes on. The orchestrator
//! writes the rewritten content to a temporary artifact, analyzes that, and
//! maps reported paths back to the original file.

use std::path::Path;

/// Rewrites file content before analysis.
pub trait Preprocessor: Send + Sync {
    /// Returns the rewritten content, or `None` when the file is unchanged.
    fn transform(&self, path: &Path, content: &str) -> Option<String>;

    /// Short strategy name for log messages.
    fn name(&self) -> &str;
}

/// The documented disabled variant: never rewrites anything.
pub struct NoopPreprocessor;

impl Preprocessor for NoopPreprocessor {
    fn transform(&self, _path: &Path, _content: &str) -> Option<String> {
        None
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Closes unterminated document scaffolding in template fragments.
///
/// Only appends, never prepends or edits existing lines, so every reported
/// line number in the original range stays valid.
pub struct FragmentWrapper;

impl Preprocessor for FragmentWrapper {
    fn transform(&self, _path: &Path, content: &str) -> Option<String> {
        let lower = content.to_ascii_lowercase();

        let opens_html = lower.contains("<html");
        let closes_html = lower.contains("</html>");
        let opens_body = lower.contains("<body");
        let closes_body = lower.contains("</body>");

        let mut tail = String::new();
        if opens_body && !closes_body {
            tail.push_str("</body>\n");
        }
        if opens_html && !closes_html {
            tail.push_str("</html>\n");
        }

        if tail.is_empty() {
            return None;
        }

        let mut rewritten = String::with_capacity(content.len() + tail.len() + 1);
        rewritten.push_str(content);
        if !content.ends_with('\n') {
            rewritten.push('\n');
        }
        rewritten.push_str(&tail);
        Some(rewritten)
    }

    fn name(&self) -> &str {
        "fragment-wrapper"
    }
}
