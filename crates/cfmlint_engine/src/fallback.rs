//! Degraded-mode fallback analysis.
//!
//! When the engine fails or times out on a file, a fallback scanner may
//! still produce a handful of high-confidence findings from plain text
//! matching. Findings are degraded results, not a replacement for the
//! engine's rule set.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// A finding produced without the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackIssue {
    pub rule_id: String,
    pub severity: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Produces degraded findings for a file the engine could not analyze.
pub trait FallbackScanner: Send + Sync {
    /// Scans `content` and returns any findings, already capped.
    fn scan_file(&self, path: &Path, content: &str) -> Vec<FallbackIssue>;

    /// Short strategy name for log messages.
    fn name(&self) -> &str;
}

/// The documented disabled variant: never finds anything.
pub struct DisabledFallback;

impl FallbackScanner for DisabledFallback {
    fn scan_file(&self, _path: &Path, _content: &str) -> Vec<FallbackIssue> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

struct PatternRule {
    id: &'static str,
    severity: &'static str,
    pattern: &'static LazyLock<Regex>,
    message: &'static str,
}

static UNSCOPED_OUTPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#(?:url|form|cgi)\.[^#]+#").expect("fallback rule pattern"));
static QUERY_WITH_USER_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<cfquery[^>]*>.*#(?:url|form|cgi)\.").expect("fallback rule pattern")
});
static EVALUATE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bevaluate\s*\(").expect("fallback rule pattern"));
static SELECT_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bselect\s+\*\s+from\b").expect("fallback rule pattern"));

/// Rules are ordered most to least severe; per line, the first match wins.
static RULES: &[PatternRule] = &[
    PatternRule {
        id: "SQL_INJECTION_RISK",
        severity: "CRITICAL",
        pattern: &QUERY_WITH_USER_INPUT,
        message: "Query interpolates url/form/cgi input directly; use parameterized values",
    },
    PatternRule {
        id: "UNESCAPED_USER_OUTPUT",
        severity: "ERROR",
        pattern: &UNSCOPED_OUTPUT,
        message: "url/form/cgi value emitted without encoding",
    },
    PatternRule {
        id: "AVOID_EVALUATE",
        severity: "WARNING",
        pattern: &EVALUATE_CALL,
        message: "evaluate() defeats static analysis and is slow; use direct references",
    },
    PatternRule {
        id: "SELECT_STAR",
        severity: "WARNING",
        pattern: &SELECT_STAR,
        message: "SELECT * pulls unneeded columns; list the columns explicitly",
    },
];

/// Line-oriented regex scanner over a fixed high-confidence rule table.
pub struct PatternScanner {
    max_issues: usize,
}

impl PatternScanner {
    /// Creates a scanner that reports at most `max_issues` findings per file.
    pub fn new(max_issues: usize) -> Self {
        Self { max_issues }
    }
}

impl FallbackScanner for PatternScanner {
    fn scan_file(&self, path: &Path, content: &str) -> Vec<FallbackIssue> {
        let mut issues = Vec::new();

        'lines: for (index, line) in content.lines().enumerate() {
            for rule in RULES {
                if let Some(m) = rule.pattern.find(line) {
                    issues.push(FallbackIssue {
                        rule_id: rule.id.to_string(),
                        severity: rule.severity.to_string(),
                        message: rule.message.to_string(),
                        line: index + 1,
                        column: m.start() + 1,
                    });
                    if issues.len() >= self.max_issues {
                        debug!(
                            path = %path.display(),
                            cap = self.max_issues,
                            "fallback issue cap reached"
                        );
                        break 'lines;
                    }
                    break;
                }
            }
        }

        issues
    }

    fn name(&self) -> &str {
        "pattern-scanner"
    }
}
