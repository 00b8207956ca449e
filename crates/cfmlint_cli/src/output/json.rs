//! JSON output formatter.

use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use cfmlint_core::{ImportStats, LocatedIssue, RunReport};

#[derive(Serialize)]
struct JsonOutput<'a> {
    issues: &'a [LocatedIssue],
    run: &'a RunReport,
    import: &'a ImportStats,
}

pub fn render(issues: &[LocatedIssue], report: &RunReport, stats: &ImportStats) -> Result<()> {
    let output = JsonOutput {
        issues,
        run: report,
        import: stats,
    };
    let rendered = serde_json::to_string_pretty(&output).into_diagnostic()?;
    println!("{}", rendered);
    Ok(())
}
