//! Bounded streaming import of the result artifact.
//!
//! The engine's include inlining can blow the report up combinatorially, so
//! the importer refuses oversized artifacts before parsing, optionally
//! pre-counts issue elements, takes only the first location of each issue,
//! and samples virtual-line resolution attempts on pathological inputs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use tracing::{debug, info};

use crate::AnalyzerError;
use crate::include::IncludeResolver;
use crate::sink::{IssueBuilder, IssueSink, Severity};
use crate::source::SourceTree;

/// Out-of-bounds locations get a resolution attempt for the first thousand
/// unresolved occurrences, then only every thousandth.
const RESOLUTION_ATTEMPT_FLOOR: u64 = 1_000;
const RESOLUTION_SAMPLE_STRIDE: u64 = 1_000;

/// Progress is logged every this many processed issues.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Volume ceilings for the result artifact.
#[derive(Debug, Clone, Copy)]
pub struct ImportLimits {
    /// Hard ceiling on artifact size in bytes.
    pub max_report_bytes: u64,
    /// Hard ceiling on issue elements, enforced by the pre-count pass.
    pub max_issue_count: u64,
    /// Whether the counting pre-pass runs at all.
    pub precount_issues: bool,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_report_bytes: 64 * 1024 * 1024,
            max_issue_count: 500_000,
            precount_issues: true,
        }
    }
}

/// Counters describing one import.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Issue elements encountered in document order.
    pub issues_seen: u64,
    /// Issues handed to the sink.
    pub issues_created: u64,
    /// Location elements beyond the first of their issue.
    pub extra_locations_discarded: u64,
    /// Locations naming files outside the indexed tree.
    pub unknown_file_dropped: u64,
    /// Virtual lines whose resolution was attempted and failed.
    pub unresolved_dropped: u64,
    /// Virtual lines skipped by resolution sampling.
    pub resolution_sampled_out: u64,
}

#[derive(Debug, Default)]
struct IssueScope {
    id: Option<String>,
    severity: Option<String>,
    message: Option<String>,
    first_location_done: bool,
}

#[derive(Debug, Default)]
struct SamplingCursor {
    unresolved_seen: u64,
}

impl SamplingCursor {
    fn should_attempt(&self) -> bool {
        self.unresolved_seen < RESOLUTION_ATTEMPT_FLOOR
            || self.unresolved_seen.is_multiple_of(RESOLUTION_SAMPLE_STRIDE)
    }

    fn note_unresolved(&mut self) {
        self.unresolved_seen += 1;
    }
}

/// Streams a result artifact into located issues.
pub struct ReportImporter {
    tree: Arc<SourceTree>,
    resolver: IncludeResolver,
    limits: ImportLimits,
}

impl ReportImporter {
    pub fn new(tree: Arc<SourceTree>) -> Self {
        let resolver = IncludeResolver::new(Arc::clone(&tree));
        Self {
            tree,
            resolver,
            limits: ImportLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ImportLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Imports `report`, emitting issues to `sink` in document order.
    pub fn import(
        &self,
        report: &Path,
        sink: &mut dyn IssueSink,
    ) -> Result<ImportStats, AnalyzerError> {
        let size = fs::metadata(report)?.len();
        if size > self.limits.max_report_bytes {
            return Err(AnalyzerError::ReportTooLarge(format!(
                "artifact is {} bytes, ceiling is {} bytes",
                size, self.limits.max_report_bytes
            )));
        }

        if self.limits.precount_issues {
            let count = count_issue_elements(report)?;
            if count > self.limits.max_issue_count {
                return Err(AnalyzerError::ReportTooLarge(format!(
                    "artifact holds {} issue elements, ceiling is {}",
                    count, self.limits.max_issue_count
                )));
            }
            debug!(count, "pre-counted issue elements");
        }

        let mut reader = Reader::from_file(report)?;
        let mut buf = Vec::new();
        let mut stats = ImportStats::default();
        let mut sampling = SamplingCursor::default();
        let mut current: Option<IssueScope> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Err(e) => return Err(e.into()),
                Ok(Event::Eof) => break,
                Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                    match element.name().as_ref() {
                        b"issue" => {
                            stats.issues_seen += 1;
                            if stats.issues_seen.is_multiple_of(PROGRESS_INTERVAL) {
                                info!(
                                    processed = stats.issues_seen,
                                    created = stats.issues_created,
                                    "import progress"
                                );
                            }
                            current = Some(IssueScope {
                                id: attr_value(&element, "id")?,
                                severity: attr_value(&element, "severity")?,
                                message: attr_value(&element, "message")?,
                                first_location_done: false,
                            });
                        }
                        b"location" => {
                            if let Some(scope) = current.as_mut() {
                                if scope.first_location_done {
                                    // One reported issue per logical
                                    // violation, not one per include
                                    // expansion.
                                    stats.extra_locations_discarded += 1;
                                } else {
                                    scope.first_location_done = true;
                                    let issue = IssueScope {
                                        id: scope.id.clone(),
                                        severity: scope.severity.clone(),
                                        message: scope.message.clone(),
                                        first_location_done: true,
                                    };
                                    self.process_location(
                                        &issue,
                                        &element,
                                        &mut stats,
                                        &mut sampling,
                                        sink,
                                    )?;
                                }
                            } else {
                                debug!("location element outside an issue, ignoring");
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(element)) => {
                    if element.name().as_ref() == b"issue" {
                        current = None;
                    }
                }
                Ok(_) => {}
            }
            buf.clear();
        }

        info!(
            seen = stats.issues_seen,
            created = stats.issues_created,
            discarded_locations = stats.extra_locations_discarded,
            unresolved = stats.unresolved_dropped,
            sampled_out = stats.resolution_sampled_out,
            "import finished"
        );
        Ok(stats)
    }

    fn process_location(
        &self,
        issue: &IssueScope,
        location: &BytesStart<'_>,
        stats: &mut ImportStats,
        sampling: &mut SamplingCursor,
        sink: &mut dyn IssueSink,
    ) -> Result<(), AnalyzerError> {
        let Some(rule_id) = issue.id.as_deref() else {
            debug!("issue without rule id, dropping");
            return Ok(());
        };

        let file_attr = attr_value(location, "file")?;
        let line_attr = attr_value(location, "line")?;
        let loc_message = attr_value(location, "message")?;

        let Some(file_attr) = file_attr else {
            debug!(rule = rule_id, "location without file attribute, dropping");
            return Ok(());
        };
        let Some(line) = line_attr.as_deref().and_then(|v| v.parse::<usize>().ok()) else {
            debug!(rule = rule_id, file = %file_attr, "location without usable line, dropping");
            return Ok(());
        };

        let Some(input) = self.tree.lookup(Path::new(&file_attr)) else {
            debug!(file = %file_attr, "location names a file outside the tree");
            stats.unknown_file_dropped += 1;
            return Ok(());
        };

        let message = loc_message
            .or_else(|| issue.message.clone())
            .unwrap_or_else(|| "Lint issue".to_string());
        let severity = Severity::parse(issue.severity.as_deref().unwrap_or(""));

        if line >= 1 && line <= input.line_count() {
            IssueBuilder::new()
                .on(&input)
                .at(line)
                .message(message)
                .for_rule(rule_id)
                .severity(severity)
                .save(sink);
            stats.issues_created += 1;
            return Ok(());
        }

        // Virtual line from include inlining.
        debug!(
            line,
            file_lines = input.line_count(),
            file = %input.name(),
            "virtual line detected"
        );

        if !sampling.should_attempt() {
            sampling.note_unresolved();
            stats.resolution_sampled_out += 1;
            return Ok(());
        }

        match self.resolver.resolve(&input, line) {
            Some(resolved) => {
                let message = match (resolved.included, &resolved.directive) {
                    (true, Some(directive)) => {
                        format!("{} (from included file: {})", message, directive)
                    }
                    _ => message,
                };
                IssueBuilder::new()
                    .on(&resolved.file)
                    .at(resolved.line)
                    .message(message)
                    .for_rule(rule_id)
                    .severity(severity)
                    .save(sink);
                stats.issues_created += 1;
            }
            None => {
                sampling.note_unresolved();
                stats.unresolved_dropped += 1;
            }
        }
        Ok(())
    }
}

/// Streaming pre-pass that only counts issue elements.
fn count_issue_elements(report: &Path) -> Result<u64, AnalyzerError> {
    let mut reader = Reader::from_file(report)?;
    let mut buf = Vec::new();
    let mut count: u64 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(e.into()),
            Ok(Event::Eof) => break,
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                if element.name().as_ref() == b"issue" {
                    count += 1;
                }
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    Ok(count)
}

fn attr_value(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, AnalyzerError> {
    let attr = element
        .try_get_attribute(name)
        .map_err(|e| AnalyzerError::artifact(format!("bad '{}' attribute: {}", name, e)))?;
    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| AnalyzerError::artifact(format!("bad '{}' value: {}", name, e)))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::source::SourceFile;
    use pretty_assertions::assert_eq;
    use std::fmt::Write as _;

    fn fixture_tree() -> Arc<SourceTree> {
        let tree = Arc::new(SourceTree::new("/project"));
        // 3-line root whose third line includes a 5-line partial.
        tree.insert(SourceFile::from_content(
            PathBuf::from("/project/root.cfm"),
            "one\ntwo\n<cfinclude template=\"part.cfm\">\n".to_string(),
        ));
        tree.insert(SourceFile::from_content(
            PathBuf::from("/project/part.cfm"),
            "a\nb\nc\nd\ne\n".to_string(),
        ));
        tree
    }

    fn write_report(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn wrap(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<issues version=\"1.0\">\n{}\n</issues>\n",
            body
        )
    }

    #[test]
    fn test_oversized_artifact_rejected_before_parsing() {
        let (_dir, path) = write_report(&wrap("<issue id=\"A\"/>"));
        let importer = ReportImporter::new(fixture_tree()).with_limits(ImportLimits {
            max_report_bytes: 10,
            ..ImportLimits::default()
        });

        let mut sink = MemorySink::new();
        let result = importer.import(&path, &mut sink);
        assert!(matches!(result, Err(AnalyzerError::ReportTooLarge(_))));
        assert!(sink.issues().is_empty());
    }

    #[test]
    fn test_issue_count_ceiling_enforced_by_precount() {
        let body = "<issue id=\"A\" severity=\"ERROR\" message=\"m\"/>\n".repeat(5);
        let (_dir, path) = write_report(&wrap(&body));
        let importer = ReportImporter::new(fixture_tree()).with_limits(ImportLimits {
            max_issue_count: 3,
            ..ImportLimits::default()
        });

        let mut sink = MemorySink::new();
        let result = importer.import(&path, &mut sink);
        assert!(matches!(result, Err(AnalyzerError::ReportTooLarge(_))));
    }

    #[test]
    fn test_in_bounds_location_creates_issue_directly() {
        let body = r#"<issue id="VAR_INVALID_NAME" severity="WARNING" message="bad name">
            <location file="/project/root.cfm" line="2" column="1" message="variable x"/>
        </issue>"#;
        let (_dir, path) = write_report(&wrap(body));

        let mut sink = MemorySink::new();
        let stats = ReportImporter::new(fixture_tree())
            .import(&path, &mut sink)
            .unwrap();

        assert_eq!(stats.issues_seen, 1);
        assert_eq!(stats.issues_created, 1);
        let issue = &sink.issues()[0];
        assert_eq!(issue.rule_id, "VAR_INVALID_NAME");
        assert_eq!(issue.file, PathBuf::from("/project/root.cfm"));
        assert_eq!(issue.line, 2);
        assert_eq!(issue.message, "variable x");
        assert_eq!(issue.severity, Severity::Warning);
    }

    #[test]
    fn test_only_first_location_is_reported() {
        let body = r#"<issue id="R" severity="ERROR" message="m">
            <location file="/project/root.cfm" line="1" column="1" message="first"/>
            <location file="/project/root.cfm" line="2" column="1" message="second"/>
            <location file="/project/root.cfm" line="3" column="1" message="third"/>
        </issue>"#;
        let (_dir, path) = write_report(&wrap(body));

        let mut sink = MemorySink::new();
        let stats = ReportImporter::new(fixture_tree())
            .import(&path, &mut sink)
            .unwrap();

        assert_eq!(stats.issues_created, 1);
        assert_eq!(stats.extra_locations_discarded, 2);
        assert_eq!(sink.issues()[0].message, "first");
    }

    #[test]
    fn test_virtual_line_resolves_into_included_file() {
        // Virtual line 5 lands on part.cfm line 2 (include range starts at 4).
        let body = r#"<issue id="R" severity="ERROR" message="m">
            <location file="/project/root.cfm" line="5" column="1" message="bad include line"/>
        </issue>"#;
        let (_dir, path) = write_report(&wrap(body));

        let mut sink = MemorySink::new();
        let stats = ReportImporter::new(fixture_tree())
            .import(&path, &mut sink)
            .unwrap();

        assert_eq!(stats.issues_created, 1);
        let issue = &sink.issues()[0];
        assert_eq!(issue.file, PathBuf::from("/project/part.cfm"));
        assert_eq!(issue.line, 2);
        assert_eq!(
            issue.message,
            "bad include line (from included file: part.cfm)"
        );
    }

    #[test]
    fn test_unresolvable_virtual_line_is_dropped_and_counted() {
        let body = r#"<issue id="R" severity="ERROR" message="m">
            <location file="/project/root.cfm" line="999" column="1" message="nowhere"/>
        </issue>"#;
        let (_dir, path) = write_report(&wrap(body));

        let mut sink = MemorySink::new();
        let stats = ReportImporter::new(fixture_tree())
            .import(&path, &mut sink)
            .unwrap();

        assert_eq!(stats.issues_created, 0);
        assert_eq!(stats.unresolved_dropped, 1);
        assert!(sink.issues().is_empty());
    }

    #[test]
    fn test_unknown_file_is_dropped_and_counted() {
        let body = r#"<issue id="R" severity="ERROR" message="m">
            <location file="/elsewhere/x.cfm" line="1" column="1" message="m"/>
        </issue>"#;
        let (_dir, path) = write_report(&wrap(body));

        let mut sink = MemorySink::new();
        let stats = ReportImporter::new(fixture_tree())
            .import(&path, &mut sink)
            .unwrap();

        assert_eq!(stats.unknown_file_dropped, 1);
        assert!(sink.issues().is_empty());
    }

    #[test]
    fn test_resolution_attempts_are_sampled_after_floor() {
        let mut body = String::new();
        for i in 0..1005 {
            let _ = write!(
                body,
                "<issue id=\"R{}\" severity=\"ERROR\" message=\"m\">\
                 <location file=\"/project/root.cfm\" line=\"5000\" column=\"1\" message=\"m\"/>\
                 </issue>\n",
                i
            );
        }
        let (_dir, path) = write_report(&wrap(&body));

        let mut sink = MemorySink::new();
        let stats = ReportImporter::new(fixture_tree())
            .import(&path, &mut sink)
            .unwrap();

        // 1000 attempts up to the floor, one sampled attempt at the stride
        // boundary, everything after that skipped.
        assert_eq!(stats.unresolved_dropped, 1001);
        assert_eq!(stats.resolution_sampled_out, 4);
        assert_eq!(stats.issues_created, 0);
    }

    #[test]
    fn test_issue_without_rule_id_is_dropped() {
        let body = r#"<issue severity="ERROR" message="m">
            <location file="/project/root.cfm" line="1" column="1" message="m"/>
        </issue>"#;
        let (_dir, path) = write_report(&wrap(body));

        let mut sink = MemorySink::new();
        let stats = ReportImporter::new(fixture_tree())
            .import(&path, &mut sink)
            .unwrap();

        assert_eq!(stats.issues_seen, 1);
        assert_eq!(stats.issues_created, 0);
    }

    #[test]
    fn test_document_order_is_preserved() {
        let body = r#"<issue id="A" severity="ERROR" message="m">
            <location file="/project/root.cfm" line="1" column="1" message="first"/>
        </issue>
        <issue id="B" severity="ERROR" message="m">
            <location file="/project/root.cfm" line="2" column="1" message="second"/>
        </issue>"#;
        let (_dir, path) = write_report(&wrap(body));

        let mut sink = MemorySink::new();
        ReportImporter::new(fixture_tree())
            .import(&path, &mut sink)
            .unwrap();

        let rules: Vec<&str> = sink.issues().iter().map(|i| i.rule_id.as_str()).collect();
        assert_eq!(rules, vec!["A", "B"]);
    }
}
