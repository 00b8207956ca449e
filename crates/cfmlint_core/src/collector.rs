//! Failure categorization and aggregation.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::AnalyzerError;

/// Fixed failure taxonomy.
///
/// Message-based categories are tested in a fixed priority order, first
/// match wins; messages are often ambiguous (one may mention both "tag" and
/// "html parser"), so the order is a contract, not a heuristic.
/// `Timeout` is assigned structurally from the failure kind, never from
/// message patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    ParserNullSafety,
    HtmlParserFailure,
    MissingDocumentStructure,
    MalformedMarkup,
    CfmlSyntax,
    FileAccess,
    Timeout,
    Uncategorized,
}

impl ErrorCategory {
    /// Categorizes a failure message. `is_io` marks failures whose kind is
    /// already known to be file access (checked at file-access priority).
    pub fn from_message(message: &str, is_io: bool) -> Self {
        let lower = message.to_ascii_lowercase();

        if lower.contains("null pointer")
            || lower.contains("nullpointer")
            || lower.contains("parsertag")
            || lower.contains("tag.getelement")
        {
            return Self::ParserNullSafety;
        }

        if lower.contains("jericho") || lower.contains("html parser") || lower.contains("malformed html")
        {
            return Self::HtmlParserFailure;
        }

        if lower.contains("missing")
            && (lower.contains("doctype")
                || lower.contains("<html>")
                || lower.contains("<head>")
                || lower.contains("<body>"))
        {
            return Self::MissingDocumentStructure;
        }

        if lower.contains("tag")
            && (lower.contains("malformed") || lower.contains("unclosed") || lower.contains("invalid"))
        {
            return Self::MalformedMarkup;
        }

        if lower.contains("cfml") || lower.contains("coldfusion") || lower.contains("cflint") {
            return Self::CfmlSyntax;
        }

        if is_io
            || lower.contains("file")
            || lower.contains("access")
            || lower.contains("permission")
        {
            return Self::FileAccess;
        }

        Self::Uncategorized
    }

    /// Categorizes an analyzer error, using its kind for the I/O check.
    pub fn from_error(error: &AnalyzerError) -> Self {
        let is_io = matches!(
            error,
            AnalyzerError::Io(_)
                | AnalyzerError::File(_)
                | AnalyzerError::Engine(cfmlint_engine::EngineError::Io(_))
        );
        Self::from_message(&error.to_string(), is_io)
    }

    /// Human-readable description used in reports.
    pub fn description(self) -> &'static str {
        match self {
            Self::ParserNullSafety => "Parser null-safety faults",
            Self::HtmlParserFailure => "HTML parser failures",
            Self::MissingDocumentStructure => "Missing HTML document structure",
            Self::MalformedMarkup => "Malformed HTML/CFML tags",
            Self::CfmlSyntax => "CFML syntax errors",
            Self::FileAccess => "File access/IO errors",
            Self::Timeout => "Analysis timeouts",
            Self::Uncategorized => "Uncategorized errors",
        }
    }

    /// Remediation hint shown in the report for this category, if any.
    fn hint(self) -> Option<&'static str> {
        match self {
            Self::MissingDocumentStructure => {
                Some("add document structure (doctype, html, head, body) to template fragments")
            }
            Self::MalformedMarkup => {
                Some("check tag closure and move script/style elements into the head")
            }
            Self::ParserNullSafety | Self::HtmlParserFailure => {
                Some("these files may be template fragments; consider fragment parsing mode")
            }
            Self::CfmlSyntax => Some("review CFML syntax for invalid tags or malformed expressions"),
            Self::Timeout => Some("raise the per-file timeout or review the slow files"),
            Self::FileAccess | Self::Uncategorized => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One recorded failure: the final categorized failure of a file in a run.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub file: String,
    pub message: String,
    pub category: ErrorCategory,
    pub timestamp: SystemTime,
}

/// Number of failing files listed verbatim in the report.
const REPORT_EXAMPLE_LIMIT: usize = 10;

/// Accumulates categorized failures across a run.
///
/// One record per file key; recording a new failure for the same key
/// replaces the previous record and its category count.
#[derive(Debug, Default)]
pub struct ParsingErrorCollector {
    errors_by_file: HashMap<String, ParseError>,
    category_counts: HashMap<ErrorCategory, usize>,
    insertion_order: Vec<String>,
}

impl ParsingErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a categorized failure for `key` (a file path or a synthetic
    /// phase key such as `batch-analysis`).
    pub fn record_failure(&mut self, key: impl Into<String>, error: &AnalyzerError) {
        let category = ErrorCategory::from_error(error);
        self.insert(key.into(), error.to_string(), category);
    }

    /// Records a per-file timeout. Timeouts carry their own category.
    pub fn record_timeout(&mut self, key: impl Into<String>, timeout: Duration) {
        let message = format!("analysis exceeded the {}s deadline", timeout.as_secs());
        self.insert(key.into(), message, ErrorCategory::Timeout);
    }

    fn insert(&mut self, key: String, message: String, category: ErrorCategory) {
        debug!(file = %key, category = %category, message = %message, "recorded failure");

        let record = ParseError {
            file: key.clone(),
            message,
            category,
            timestamp: SystemTime::now(),
        };

        if let Some(previous) = self.errors_by_file.insert(key.clone(), record) {
            // Replacing a record: keep the counts consistent with the map.
            if let Some(count) = self.category_counts.get_mut(&previous.category) {
                *count = count.saturating_sub(1);
            }
        } else {
            self.insertion_order.push(key);
        }
        *self.category_counts.entry(category).or_insert(0) += 1;
    }

    /// Number of files with a recorded failure.
    pub fn error_count(&self) -> usize {
        self.errors_by_file.len()
    }

    /// Failure count for one category.
    pub fn count_by_category(&self, category: ErrorCategory) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Success rate over `total` attempted files, as a percentage.
    /// Zero attempts count as fully successful.
    pub fn success_rate(&self, total: usize) -> f64 {
        if total == 0 {
            return 100.0;
        }
        ((total - self.errors_by_file.len().min(total)) as f64 / total as f64) * 100.0
    }

    /// Builds the human-readable failure report.
    pub fn report(&self) -> String {
        if self.errors_by_file.is_empty() {
            return "No parsing errors detected.".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "=== Parsing Error Report ===");
        let _ = writeln!(out, "Files with errors: {}", self.errors_by_file.len());
        let _ = writeln!(out);

        let _ = writeln!(out, "Categories:");
        let mut categories: Vec<(&ErrorCategory, &usize)> = self
            .category_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .collect();
        categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| format!("{:?}", a.0).cmp(&format!("{:?}", b.0))));
        for (category, count) in &categories {
            let percentage = **count as f64 / self.errors_by_file.len() as f64 * 100.0;
            let _ = writeln!(
                out,
                "  {}: {} ({:.1}%)",
                category.description(),
                count,
                percentage
            );
        }

        let hints: Vec<&str> = categories
            .iter()
            .filter_map(|(category, _)| category.hint())
            .collect();
        if !hints.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Recommendations:");
            for hint in hints {
                let _ = writeln!(out, "  - {}", hint);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Failed files (first {}):", REPORT_EXAMPLE_LIMIT);
        for key in self.insertion_order.iter().take(REPORT_EXAMPLE_LIMIT) {
            if let Some(error) = self.errors_by_file.get(key) {
                let _ = writeln!(out, "  {}: [{}] {}", error.file, error.category, error.message);
            }
        }
        if self.insertion_order.len() > REPORT_EXAMPLE_LIMIT {
            let _ = writeln!(
                out,
                "  ... and {} more files",
                self.insertion_order.len() - REPORT_EXAMPLE_LIMIT
            );
        }

        out
    }

    /// Drops all recorded failures.
    pub fn clear(&mut self) {
        self.errors_by_file.clear();
        self.category_counts.clear();
        self.insertion_order.clear();
    }
}
