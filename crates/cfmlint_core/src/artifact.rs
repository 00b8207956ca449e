//! Intermediate result artifact synthesis.
//!
//! In batch mode the engine writes the whole report itself. In isolated
//! mode the orchestrator assembles the artifact: a wrapping root element,
//! one issue fragment per analyzed file, degraded fallback issues in the
//! same schema, and HTML-comment markers for failures and timeouts so a
//! partial run stays debuggable.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use quick_xml::escape::escape;

use cfmlint_engine::fallback::FallbackIssue;

use crate::AnalyzerError;
use crate::collector::ErrorCategory;

/// Writes the combined result artifact for an isolated-mode run.
pub struct ArtifactWriter {
    out: BufWriter<File>,
    path: PathBuf,
}

impl ArtifactWriter {
    /// Creates the artifact file, truncating any previous run's output.
    pub fn create(path: &Path) -> Result<Self, AnalyzerError> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Writes the XML declaration and the opening root element.
    pub fn begin_document(&mut self) -> Result<(), AnalyzerError> {
        writeln!(self.out, r#"<?xml version="1.0" encoding="UTF-8" ?>"#)?;
        writeln!(self.out, r#"<issues version="1.0">"#)?;
        Ok(())
    }

    /// Writes pre-rendered issue fragments from a single-file engine run.
    pub fn write_fragments(&mut self, fragments: &str) -> Result<(), AnalyzerError> {
        writeln!(self.out, "{}", fragments.trim_end())?;
        Ok(())
    }

    /// Writes degraded fallback findings in the artifact schema.
    pub fn write_fallback_issues(
        &mut self,
        file: &Path,
        issues: &[FallbackIssue],
    ) -> Result<(), AnalyzerError> {
        let file_display = file.display().to_string();
        let file_attr = escape(file_display.as_str()).into_owned();
        for issue in issues {
            writeln!(
                self.out,
                r#"<issue severity="{}" id="{}" message="{}">"#,
                escape(issue.severity.as_str()),
                escape(issue.rule_id.as_str()),
                escape(issue.message.as_str()),
            )?;
            writeln!(
                self.out,
                r#"  <location file="{}" line="{}" column="{}" message="{}"/>"#,
                file_attr,
                issue.line,
                issue.column,
                escape(issue.message.as_str()),
            )?;
            writeln!(self.out, "</issue>")?;
        }
        Ok(())
    }

    /// Writes a timeout marker comment.
    pub fn write_timeout_marker(
        &mut self,
        file: &Path,
        kind: &str,
        timeout: Duration,
        consecutive: u32,
    ) -> Result<(), AnalyzerError> {
        writeln!(
            self.out,
            "<!-- TIMEOUT: File={}, Type={}, Timeout={}s, ConsecutiveTimeouts={} -->",
            sanitize_comment(&file.display().to_string()),
            kind,
            timeout.as_secs(),
            consecutive,
        )?;
        Ok(())
    }

    /// Writes a parsing-error marker comment.
    pub fn write_error_marker(
        &mut self,
        file: &Path,
        error: &str,
        category: ErrorCategory,
    ) -> Result<(), AnalyzerError> {
        writeln!(
            self.out,
            "<!-- PARSING_ERROR: File={}, Error={}, Type={:?} -->",
            sanitize_comment(&file.display().to_string()),
            sanitize_comment(error),
            category,
        )?;
        Ok(())
    }

    /// Writes the closing root element.
    pub fn finish_document(&mut self) -> Result<(), AnalyzerError> {
        writeln!(self.out, "</issues>")?;
        Ok(())
    }

    /// Flushes and returns the artifact path.
    pub fn finish(mut self) -> Result<PathBuf, AnalyzerError> {
        self.out.flush()?;
        Ok(self.path)
    }
}

/// `--` terminates an XML comment; keep arbitrary messages comment-safe.
fn sanitize_comment(text: &str) -> String {
    text.replace("--", "- -")
}

/// Extracts the `<issue>...</issue>` span from a full engine report.
///
/// Returns `None` when the report contains no issue elements. The leading
/// match must be an `issue` element proper, not the `issues` root.
pub fn extract_issue_fragments(xml: &str) -> Option<&str> {
    let bytes = xml.as_bytes();

    let mut start = None;
    let mut from = 0;
    while let Some(found) = xml[from..].find("<issue") {
        let at = from + found;
        match bytes.get(at + "<issue".len()) {
            Some(b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/') => {
                start = Some(at);
                break;
            }
            _ => from = at + "<issue".len(),
        }
    }

    let start = start?;
    let end = xml.rfind("</issue>")? + "</issue>".len();
    if end <= start {
        return None;
    }
    Some(&xml[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_skips_issues_root_element() {
        let xml = concat!(
            "<?xml version=\"1.0\"?>\n",
            "<issues version=\"1.0\">\n",
            "<issue id=\"A\"><location file=\"x\" line=\"1\"/></issue>\n",
            "<issue id=\"B\"/>\n",
            "</issues>\n",
        );
        let fragments = extract_issue_fragments(xml).unwrap();
        assert!(fragments.starts_with("<issue id=\"A\">"));
        assert!(fragments.ends_with("</issue>"));
        assert!(!fragments.contains("<issues"));
    }

    #[test]
    fn test_extract_empty_report_is_none() {
        let xml = "<?xml version=\"1.0\"?>\n<issues version=\"1.0\">\n</issues>\n";
        assert!(extract_issue_fragments(xml).is_none());
    }

    #[test]
    fn test_writer_produces_wrapped_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xml");

        let mut writer = ArtifactWriter::create(&path).unwrap();
        writer.begin_document().unwrap();
        writer
            .write_fragments("<issue id=\"A\"><location file=\"a.cfm\" line=\"1\"/></issue>")
            .unwrap();
        writer
            .write_timeout_marker(
                Path::new("/p/slow.cfm"),
                "ANALYSIS_TIMEOUT",
                Duration::from_secs(30),
                2,
            )
            .unwrap();
        writer.finish_document().unwrap();
        let written = writer.finish().unwrap();

        let content = std::fs::read_to_string(written).unwrap();
        assert!(content.starts_with("<?xml"));
        assert!(content.contains("<issues version=\"1.0\">"));
        assert!(content.contains("<issue id=\"A\">"));
        assert!(content.contains("<!-- TIMEOUT: File=/p/slow.cfm, Type=ANALYSIS_TIMEOUT, Timeout=30s, ConsecutiveTimeouts=2 -->"));
        assert!(content.trim_end().ends_with("</issues>"));
    }

    #[test]
    fn test_error_marker_sanitizes_comment_terminator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xml");

        let mut writer = ArtifactWriter::create(&path).unwrap();
        writer.begin_document().unwrap();
        writer
            .write_error_marker(
                Path::new("/p/a.cfm"),
                "unexpected -- token",
                ErrorCategory::Uncategorized,
            )
            .unwrap();
        writer.finish_document().unwrap();
        let written = writer.finish().unwrap();

        let content = std::fs::read_to_string(written).unwrap();
        assert!(content.contains("unexpected - - token"));
        assert!(!content.contains("unexpected -- token"));
    }

    #[test]
    fn test_fallback_issues_use_artifact_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xml");

        let issues = vec![FallbackIssue {
            rule_id: "UNESCAPED_USER_OUTPUT".to_string(),
            severity: "ERROR".to_string(),
            message: "url value emitted without encoding".to_string(),
            line: 7,
            column: 3,
        }];

        let mut writer = ArtifactWriter::create(&path).unwrap();
        writer.begin_document().unwrap();
        writer
            .write_fallback_issues(Path::new("/p/a.cfm"), &issues)
            .unwrap();
        writer.finish_document().unwrap();
        let written = writer.finish().unwrap();

        let content = std::fs::read_to_string(written).unwrap();
        assert!(content.contains(r#"<issue severity="ERROR" id="UNESCAPED_USER_OUTPUT""#));
        assert!(content.contains(r#"<location file="/p/a.cfm" line="7" column="3""#));
    }
}
