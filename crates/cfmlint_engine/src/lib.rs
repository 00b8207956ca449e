//! # cfmlint_engine
//!
//! Adapter boundary for the external CFML analysis engine.
//!
//! The engine is a non-interactive batch tool: it is handed a set of files,
//! lints them, and emits an XML issue report. It is also fragile -- it can
//! hang or crash on malformed input -- so everything above this crate treats
//! a scan as an operation that may fail or never return.
//!
//! This crate provides:
//! - The [`AnalysisEngine`] trait and the [`CommandEngine`] child-process
//!   implementation.
//! - The pluggable [`preprocess::Preprocessor`] and
//!   [`fallback::FallbackScanner`] strategies with their disabled variants.

mod command;
mod error;
pub mod fallback;
pub mod preprocess;

pub use command::CommandEngine;
pub use error::EngineError;

use std::path::PathBuf;

/// A non-interactive analysis engine invoked once per scan.
///
/// Implementations must be callable from a worker thread; a scan may block
/// for an arbitrary amount of time (the engine is not cancellation-aware),
/// so deadline enforcement is the caller's job.
pub trait AnalysisEngine: Send + Sync {
    /// Runs the engine over `files` and returns its native XML report.
    fn scan(&self, files: &[PathBuf]) -> Result<String, EngineError>;

    /// Short engine name for log messages.
    fn name(&self) -> &str;
}
