//! Text output formatter.

use std::collections::HashMap;
use std::path::PathBuf;

use cfmlint_core::{ImportStats, LocatedIssue, RunReport};

pub fn render(issues: &[LocatedIssue], report: &RunReport, stats: &ImportStats) {
    // Group by file, preserving first-seen order.
    let mut order: Vec<PathBuf> = Vec::new();
    let mut by_file: HashMap<PathBuf, Vec<&LocatedIssue>> = HashMap::new();
    for issue in issues {
        if !by_file.contains_key(&issue.file) {
            order.push(issue.file.clone());
        }
        by_file.entry(issue.file.clone()).or_default().push(issue);
    }

    for file in &order {
        println!("\n{}:", file.display());
        for issue in &by_file[file] {
            println!(
                "  {} {} [{}]: {}",
                issue.line,
                issue.severity.as_str(),
                issue.rule_id,
                issue.message
            );
        }
    }

    println!();
    println!(
        "Analyzed {} files: {} succeeded, {} failed, {} timed out",
        report.total_files, report.succeeded, report.failed, report.timed_out
    );
    println!(
        "Imported {} issues ({} reported, {} duplicate locations discarded)",
        stats.issues_created, stats.issues_seen, stats.extra_locations_discarded
    );

    let dropped = stats.unresolved_dropped + stats.resolution_sampled_out;
    if dropped > 0 {
        println!("Dropped {} issues with unresolvable virtual lines", dropped);
    }
    if report.circuit_breaker_tripped {
        println!("Analysis stopped early: too many consecutive timeouts");
    }
}
