//! Issue reporting sink.
//!
//! The importer hands finished issues to a host-supplied sink and never
//! inspects a return value; the sink is a write-only, fire-and-forget
//! target.

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::source::SourceFile;

/// Issue severity as reported by the engine. Unknown values parse as
/// `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Critical,
    Error,
    Warning,
    Caution,
    Info,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Warning
    }
}

impl Severity {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "FATAL" => Self::Fatal,
            "CRITICAL" => Self::Critical,
            "ERROR" => Self::Error,
            "WARNING" => Self::Warning,
            "CAUTION" => Self::Caution,
            "INFO" => Self::Info,
            _ => Self::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Caution => "caution",
            Self::Info => "info",
        }
    }
}

/// A fully located issue ready for the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedIssue {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: PathBuf,
    pub line: usize,
}

/// Write-only issue target.
pub trait IssueSink {
    fn save(&mut self, issue: LocatedIssue);
}

/// Builds one issue for a sink.
///
/// Saving with a missing file, line, or rule drops the issue with a debug
/// log instead of reporting a half-built one.
#[derive(Debug, Default)]
pub struct IssueBuilder {
    file: Option<PathBuf>,
    line: Option<usize>,
    message: Option<String>,
    rule_id: Option<String>,
    severity: Severity,
}

impl IssueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets the issue at a source file.
    pub fn on(mut self, file: &SourceFile) -> Self {
        self.file = Some(file.path().to_path_buf());
        self
    }

    /// Targets the issue at a line.
    pub fn at(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.message = Some(text.into());
        self
    }

    pub fn for_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Hands the issue to the sink. Fire-and-forget.
    pub fn save(self, sink: &mut dyn IssueSink) {
        let (Some(file), Some(line), Some(rule_id)) = (self.file, self.line, self.rule_id) else {
            debug!("dropping incomplete issue (missing file, line, or rule)");
            return;
        };

        sink.save(LocatedIssue {
            rule_id,
            severity: self.severity,
            message: self.message.unwrap_or_else(|| "Lint issue".to_string()),
            file,
            line,
        });
    }
}

/// A sink that collects issues in memory (CLI output and tests).
#[derive(Debug, Default)]
pub struct MemorySink {
    issues: Vec<LocatedIssue>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> &[LocatedIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<LocatedIssue> {
        self.issues
    }
}

impl IssueSink for MemorySink {
    fn save(&mut self, issue: LocatedIssue) {
        self.issues.push(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file() -> SourceFile {
        SourceFile::from_content(PathBuf::from("/tmp/a.cfm"), "x\n".to_string())
    }

    #[test]
    fn test_builder_saves_complete_issue() {
        let mut sink = MemorySink::new();
        let file = file();

        IssueBuilder::new()
            .on(&file)
            .at(3)
            .message("bad things")
            .for_rule("SOME_RULE")
            .severity(Severity::Error)
            .save(&mut sink);

        assert_eq!(sink.issues().len(), 1);
        let issue = &sink.issues()[0];
        assert_eq!(issue.rule_id, "SOME_RULE");
        assert_eq!(issue.line, 3);
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.file, PathBuf::from("/tmp/a.cfm"));
    }

    #[test]
    fn test_incomplete_issue_is_dropped() {
        let mut sink = MemorySink::new();

        IssueBuilder::new().at(3).message("no file").save(&mut sink);
        IssueBuilder::new().on(&file()).message("no line").save(&mut sink);

        assert!(sink.issues().is_empty());
    }

    #[test]
    fn test_missing_message_gets_placeholder() {
        let mut sink = MemorySink::new();

        IssueBuilder::new()
            .on(&file())
            .at(1)
            .for_rule("R")
            .save(&mut sink);

        assert_eq!(sink.issues()[0].message, "Lint issue");
    }

    #[test]
    fn test_severity_parsing_defaults_to_warning() {
        assert_eq!(Severity::parse("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse("info"), Severity::Info);
        assert_eq!(Severity::parse("whatever"), Severity::Warning);
        assert_eq!(Severity::parse(""), Severity::Warning);
    }
}
