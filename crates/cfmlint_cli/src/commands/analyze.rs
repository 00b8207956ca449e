//! Analyze command implementation.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use miette::{IntoDiagnostic, Result, miette};
use tracing::{info, warn};

use cfmlint_core::{
    Analyzer, AnalyzerConfig, MemorySink, ParsingMode, ReportImporter, SourceTree, index_files,
};
use cfmlint_engine::CommandEngine;
use cfmlint_engine::fallback::PatternScanner;
use cfmlint_engine::preprocess::FragmentWrapper;

use crate::cli::{AnalyzeArgs, Cli};
use crate::discover::FileFinder;
use crate::output;

/// Runs a full analysis: discover, orchestrate, import, render.
///
/// Returns `false` when the run completed but should fail the invocation
/// (circuit breaker, or parse failures with `skip_malformed_files` off).
pub fn run(cli: &Cli, args: &AnalyzeArgs) -> Result<bool> {
    if !matches!(args.format.as_str(), "text" | "json") {
        return Err(miette!("unknown output format: {}", args.format));
    }

    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::from_file(path).into_diagnostic()?,
        None => find_config()?,
    };

    if let Some(timeout) = args.timeout {
        config.file_timeout_secs = timeout;
    }
    if let Some(mode) = &args.mode {
        config.parsing_mode = ParsingMode::parse(mode);
    }

    let program = args
        .engine
        .clone()
        .or_else(|| config.engine.program.clone())
        .ok_or_else(|| {
            miette!("no engine configured; pass --engine or set engine.program in .cfmlint.jsonc")
        })?;
    let mut engine_args = config.engine.args.clone();
    engine_args.extend(args.engine_args.iter().cloned());
    let engine = Arc::new(CommandEngine::new(program).with_args(engine_args));

    let root = std::env::current_dir().into_diagnostic()?;
    let finder = FileFinder::new(&config.include, &config.exclude)?;
    let paths = finder.discover(&args.paths)?;
    if paths.is_empty() {
        warn!("no CFML files found under the given paths");
    }

    let tree = Arc::new(SourceTree::new(&root));
    let (files, unreadable) = index_files(&tree, &paths);
    for (path, error) in &unreadable {
        warn!(path = %path.display(), error = %error, "skipping unreadable file");
    }

    // The work directory is owned by this run; a temporary one vanishes
    // with the guard, an explicit one keeps the artifact around.
    let (work_dir, _work_guard) = match &args.work_dir {
        Some(dir) => {
            fs::create_dir_all(dir).into_diagnostic()?;
            (dir.clone(), None)
        }
        None => {
            let temp = tempfile::tempdir().into_diagnostic()?;
            (temp.path().to_path_buf(), Some(temp))
        }
    };

    let mut analyzer = Analyzer::new(config.clone(), engine)
        .with_preprocessor(Box::new(FragmentWrapper))
        .with_fallback(Box::new(PatternScanner::new(config.fallback_max_issues)));
    let report = analyzer.run(&files, &work_dir).into_diagnostic()?;

    let mut sink = MemorySink::new();
    let importer = ReportImporter::new(Arc::clone(&tree));
    let stats = importer
        .import(&report.artifact, &mut sink)
        .into_diagnostic()?;

    match args.format.as_str() {
        "json" => output::json::render(sink.issues(), &report, &stats)?,
        _ => output::text::render(sink.issues(), &report, &stats),
    }

    let failures_acceptable = config.skip_malformed_files || report.failed == 0;
    Ok(!report.circuit_breaker_tripped && failures_acceptable)
}

/// Looks for a config file in the working directory, defaulting when none
/// exists.
fn find_config() -> Result<AnalyzerConfig> {
    for name in [".cfmlint.jsonc", ".cfmlint.json"] {
        let path = Path::new(name);
        if path.exists() {
            info!(config = name, "using configuration file");
            return AnalyzerConfig::from_file(path).into_diagnostic();
        }
    }
    Ok(AnalyzerConfig::default())
}
