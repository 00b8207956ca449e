//! Execution orchestration.
//!
//! A run first attempts a single batch pass when the mode allows it (fast,
//! all-or-nothing), then falls back to isolated per-file analysis with a
//! deadline per file and a circuit breaker on consecutive timeouts. Every
//! per-file failure is recovered locally; only strict mode and the breaker
//! end a run early.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use cfmlint_engine::AnalysisEngine;
use cfmlint_engine::fallback::FallbackScanner;
use cfmlint_engine::preprocess::Preprocessor;

use crate::artifact::{ArtifactWriter, extract_issue_fragments};
use crate::collector::{ErrorCategory, ParsingErrorCollector};
use crate::config::{AnalyzerConfig, ReportingLevel};
use crate::error::AnalyzerError;
use crate::pool::{EngineWorkerPool, ScanOutcome};
use crate::source::SourceFile;
use crate::state::{RunReport, RunState};

/// File name of the intermediate result artifact inside the work directory.
pub const RESULT_ARTIFACT_NAME: &str = "cfmlint-report.xml";

/// Progress is logged every this many files in the isolated pass.
const PROGRESS_FILE_INTERVAL: usize = 100;

/// Orchestrates one analysis run over a file set.
pub struct Analyzer {
    config: AnalyzerConfig,
    engine: Arc<dyn AnalysisEngine>,
    preprocessor: Option<Box<dyn Preprocessor>>,
    fallback: Option<Box<dyn FallbackScanner>>,
    collector: ParsingErrorCollector,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig, engine: Arc<dyn AnalysisEngine>) -> Self {
        Self {
            config,
            engine,
            preprocessor: None,
            fallback: None,
            collector: ParsingErrorCollector::new(),
        }
    }

    /// Injects the preprocessing strategy (consulted only when enabled in
    /// the configuration).
    pub fn with_preprocessor(mut self, preprocessor: Box<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// Injects the fallback strategy (consulted only when enabled in the
    /// configuration).
    pub fn with_fallback(mut self, fallback: Box<dyn FallbackScanner>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// The failure collector for this run.
    pub fn collector(&self) -> &ParsingErrorCollector {
        &self.collector
    }

    /// Runs the engine over `files`, writing the result artifact into
    /// `work_dir` and returning the run report.
    pub fn run(
        &mut self,
        files: &[Arc<SourceFile>],
        work_dir: &Path,
    ) -> Result<RunReport, AnalyzerError> {
        let mut state = RunState::new(files.len());
        let artifact_path = work_dir.join(RESULT_ARTIFACT_NAME);

        info!(
            files = state.total_files,
            mode = %self.config.parsing_mode,
            engine = self.engine.name(),
            "starting analysis"
        );

        let mut batch_ok = false;
        if self.config.parsing_mode.attempts_batch() {
            batch_ok = self.attempt_batch(files, &artifact_path, &mut state);
        }

        if !batch_ok {
            if self.config.parsing_mode.continues_on_error() {
                debug!("running isolated per-file analysis");
                self.isolated_pass(files, &artifact_path, work_dir, &mut state)?;
            } else {
                return Err(AnalyzerError::StrictModeFailure(
                    "batch analysis failed and strict mode forbids per-file recovery".to_string(),
                ));
            }
        }

        Ok(self.finish_run(state, artifact_path))
    }

    /// Single engine invocation over the whole file set. Fast, but one
    /// malformed file can poison the entire batch.
    fn attempt_batch(
        &mut self,
        files: &[Arc<SourceFile>],
        artifact_path: &Path,
        state: &mut RunState,
    ) -> bool {
        info!(files = files.len(), "attempting batch analysis");
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path().to_path_buf()).collect();

        let report = match self.engine.scan(&paths) {
            Ok(report) => report,
            Err(e) => {
                let err = AnalyzerError::from(e);
                warn!(error = %err, "batch analysis failed");
                self.collector.record_failure("batch-analysis", &err);
                return false;
            }
        };

        if let Err(e) = fs::write(artifact_path, report) {
            let err = AnalyzerError::from(e);
            warn!(error = %err, "failed to write batch result artifact");
            self.collector.record_failure("batch-analysis", &err);
            return false;
        }

        state.succeeded = state.total_files;
        info!(files = state.total_files, "batch analysis completed");
        true
    }

    /// Per-file analysis: slower, but failures stay contained.
    fn isolated_pass(
        &mut self,
        files: &[Arc<SourceFile>],
        artifact_path: &Path,
        work_dir: &Path,
        state: &mut RunState,
    ) -> Result<(), AnalyzerError> {
        let mut writer = ArtifactWriter::create(artifact_path)?;
        writer.begin_document()?;

        // One pool per run; torn down on every exit path when it drops.
        let mut pool = EngineWorkerPool::new(Arc::clone(&self.engine));

        for (index, file) in files.iter().enumerate() {
            self.analyze_one(&mut pool, file, &mut writer, work_dir, state)?;

            if state.circuit_breaker_tripped {
                error!("circuit breaker tripped, stopping analysis early");
                break;
            }

            let done = index + 1;
            if done % PROGRESS_FILE_INTERVAL == 0 {
                info!(
                    done,
                    total = state.total_files,
                    succeeded = state.succeeded,
                    failed = state.failed,
                    timed_out = state.timed_out,
                    "analysis progress"
                );
            }
        }

        writer.finish_document()?;
        writer.finish()?;
        Ok(())
    }

    fn analyze_one(
        &mut self,
        pool: &mut EngineWorkerPool,
        file: &Arc<SourceFile>,
        writer: &mut ArtifactWriter,
        work_dir: &Path,
        state: &mut RunState,
    ) -> Result<(), AnalyzerError> {
        let timeout = self.config.file_timeout();
        debug!(file = %file.name(), timeout_secs = timeout.as_secs(), "analyzing file");

        // The temp artifact lives exactly as long as this scope; dropping it
        // removes the file no matter how the analysis ends.
        let temp = self.preprocess(file, work_dir);
        let scan_path = temp
            .as_ref()
            .map(|t| t.path().to_path_buf())
            .unwrap_or_else(|| file.path().to_path_buf());

        match pool.scan_with_deadline(&scan_path, timeout) {
            ScanOutcome::Completed(Ok(report)) => {
                if let Some(fragments) = extract_issue_fragments(&report) {
                    let fragments = if temp.is_some() {
                        fragments.replace(
                            &scan_path.display().to_string(),
                            &file.path().display().to_string(),
                        )
                    } else {
                        fragments.to_string()
                    };
                    writer.write_fragments(&fragments)?;
                }
                state.record_success();
                debug!(file = %file.name(), "file analyzed");
            }
            ScanOutcome::Completed(Err(engine_error)) => {
                state.record_failure();
                let err = AnalyzerError::from(engine_error);
                let category = ErrorCategory::from_error(&err);
                warn!(file = %file.name(), error = %err, "file analysis failed");

                self.collector
                    .record_failure(file.path().display().to_string(), &err);
                self.attempt_fallback(file, writer);
                writer.write_error_marker(file.path(), &err.to_string(), category)?;
            }
            ScanOutcome::DeadlineExceeded => {
                let streak = state.record_timeout();
                warn!(
                    file = %file.name(),
                    timeout_secs = timeout.as_secs(),
                    consecutive = streak,
                    "file analysis timed out"
                );
                self.collector
                    .record_timeout(file.path().display().to_string(), timeout);

                if streak >= self.config.max_consecutive_timeouts {
                    let message = format!(
                        "circuit breaker: {} consecutive timeouts reached the limit of {}; \
                         the engine is systematically failing on this codebase, consider \
                         raising file_timeout_secs or reviewing the slow files",
                        streak, self.config.max_consecutive_timeouts
                    );
                    error!("{}", message);
                    self.collector.record_failure(
                        file.path().display().to_string(),
                        &AnalyzerError::Internal(message),
                    );
                    writer.write_timeout_marker(
                        file.path(),
                        "CIRCUIT_BREAKER_TRIGGERED",
                        timeout,
                        streak,
                    )?;
                    state.circuit_breaker_tripped = true;
                    return Ok(());
                }

                writer.write_timeout_marker(file.path(), "ANALYSIS_TIMEOUT", timeout, streak)?;
                self.attempt_fallback(file, writer);
            }
        }

        Ok(())
    }

    /// Applies the preprocessing strategy, returning the temp artifact to
    /// scan instead of the original file, if the content changed.
    fn preprocess(
        &self,
        file: &Arc<SourceFile>,
        work_dir: &Path,
    ) -> Option<tempfile::NamedTempFile> {
        if !self.config.preprocessing {
            return None;
        }
        let preprocessor = self.preprocessor.as_ref()?;
        let rewritten = preprocessor.transform(file.path(), file.content())?;

        let result = tempfile::Builder::new()
            .prefix("cfmlint-pre-")
            .suffix(".cfm")
            .tempfile_in(work_dir)
            .and_then(|mut temp| temp.write_all(rewritten.as_bytes()).map(|_| temp));

        match result {
            Ok(temp) => {
                debug!(
                    file = %file.name(),
                    temp = %temp.path().display(),
                    strategy = preprocessor.name(),
                    "using preprocessed content"
                );
                Some(temp)
            }
            Err(e) => {
                warn!(
                    file = %file.name(),
                    error = %e,
                    "preprocessing failed, using original file"
                );
                None
            }
        }
    }

    /// Gives the fallback strategy a chance to produce degraded results.
    fn attempt_fallback(&mut self, file: &Arc<SourceFile>, writer: &mut ArtifactWriter) {
        if !self.config.fallback_analysis {
            return;
        }
        let Some(fallback) = &self.fallback else {
            return;
        };

        let issues = fallback.scan_file(file.path(), file.content());
        if issues.is_empty() {
            debug!(file = %file.name(), "fallback analysis found no issues");
            return;
        }

        info!(
            file = %file.name(),
            issues = issues.len(),
            strategy = fallback.name(),
            "fallback analysis produced degraded results"
        );
        if let Err(e) = writer.write_fallback_issues(file.path(), &issues) {
            warn!(file = %file.name(), error = %e, "failed to write fallback results");
        }
    }

    /// Final accounting: success-rate evaluation, reporting, and the
    /// immutable run report.
    fn finish_run(&self, state: RunState, artifact: PathBuf) -> RunReport {
        let success_rate = self.collector.success_rate(state.total_files);

        if state.failed == 0 {
            info!(
                succeeded = state.succeeded,
                total = state.total_files,
                "analysis completed successfully"
            );
        } else {
            warn!(
                succeeded = state.succeeded,
                total = state.total_files,
                failed = state.failed,
                success_rate,
                "analysis completed with partial success"
            );
        }

        let failure_rate = 100.0 - success_rate;
        if failure_rate > f64::from(self.config.error_threshold) {
            let message = format!(
                "failure rate {:.1}% exceeds the configured threshold of {}%",
                failure_rate, self.config.error_threshold
            );
            if self.config.parsing_mode == crate::config::ParsingMode::Strict {
                error!("{}", message);
            } else {
                warn!("{}", message);
            }
        } else if success_rate < self.config.parsing_mode.recommended_success_threshold() {
            warn!(
                success_rate,
                mode = %self.config.parsing_mode,
                recommended = self.config.parsing_mode.recommended_success_threshold(),
                "success rate is below the recommended threshold for this mode"
            );
        }

        let error_summary = if state.failed > 0
            && self.config.error_reporting != ReportingLevel::None
        {
            let report = self.collector.report();
            info!("parsing error analysis:\n{}", report);
            Some(report)
        } else {
            None
        };

        info!(
            total = state.total_files,
            succeeded = state.succeeded,
            failed = state.failed,
            timed_out = state.timed_out,
            success_rate,
            null_safety = self.collector.count_by_category(ErrorCategory::ParserNullSafety),
            html_parser = self.collector.count_by_category(ErrorCategory::HtmlParserFailure),
            missing_structure = self
                .collector
                .count_by_category(ErrorCategory::MissingDocumentStructure),
            "analysis metrics"
        );

        RunReport {
            artifact,
            total_files: state.total_files,
            succeeded: state.succeeded,
            failed: state.failed,
            timed_out: state.timed_out,
            circuit_breaker_tripped: state.circuit_breaker_tripped,
            success_rate,
            error_summary,
        }
    }
}
