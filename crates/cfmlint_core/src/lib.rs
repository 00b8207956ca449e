//! # cfmlint_core
//!
//! Analysis orchestration core for cfmlint.
//!
//! This crate turns a fragile, single-file external lint engine into a
//! robust multi-file pipeline:
//! - The [`Analyzer`] runs the engine with per-file deadlines and a
//!   consecutive-timeout circuit breaker.
//! - The [`IncludeResolver`] maps include-expanded virtual line numbers back
//!   to real files and lines.
//! - The [`ParsingErrorCollector`] categorizes failures and reports on them.
//! - The [`ReportImporter`] streams the result artifact into located issues
//!   while guarding against pathological output volume.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cfmlint_core::{Analyzer, AnalyzerConfig, MemorySink, ReportImporter, SourceTree};
//! use cfmlint_engine::CommandEngine;
//!
//! let config = AnalyzerConfig::from_file(".cfmlint.jsonc")?;
//! let engine = Arc::new(CommandEngine::new("/usr/local/bin/cflint"));
//!
//! let tree = Arc::new(SourceTree::new(project_root));
//! let mut analyzer = Analyzer::new(config, engine);
//! let report = analyzer.run(&files, work_dir)?;
//!
//! let mut sink = MemorySink::new();
//! let stats = ReportImporter::new(tree).import(&report.artifact, &mut sink)?;
//! ```

mod analyzer;
pub mod artifact;
mod collector;
mod config;
mod error;
pub mod importer;
mod include;
pub mod pool;
mod sink;
mod source;
mod state;

pub use analyzer::{Analyzer, RESULT_ARTIFACT_NAME};
pub use collector::{ErrorCategory, ParseError, ParsingErrorCollector};
pub use config::{AnalyzerConfig, EngineConfig, ParsingMode, ReportingLevel};
pub use error::AnalyzerError;
pub use importer::{ImportLimits, ImportStats, ReportImporter};
pub use include::{IncludeMapper, IncludeMapping, IncludeResolver, ResolvedLocation};
pub use sink::{IssueBuilder, IssueSink, LocatedIssue, MemorySink, Severity};
pub use source::{SourceFile, SourceTree, index_files};
pub use state::{RunReport, RunState};
