//! Analyzer error types.

use thiserror::Error;

/// Errors that can occur while orchestrating a run or importing results.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Source file access error.
    #[error("file error: {0}")]
    File(String),

    /// External engine failure.
    #[error("engine error: {0}")]
    Engine(#[from] cfmlint_engine::EngineError),

    /// The result artifact is malformed.
    #[error("result artifact error: {0}")]
    Artifact(String),

    /// The result artifact exceeds a volume ceiling.
    #[error("result artifact rejected: {0}")]
    ReportTooLarge(String),

    /// Batch analysis failed and strict mode forbids recovery.
    #[error("analysis failed in strict mode: {0}")]
    StrictModeFailure(String),

    /// XML reader/writer failure.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a file error.
    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }

    /// Creates a result artifact error.
    pub fn artifact(message: impl Into<String>) -> Self {
        Self::Artifact(message.into())
    }
}
