//! Engine error types.

use thiserror::Error;

/// Errors raised while invoking the external engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine executable could not be started.
    #[error("failed to launch engine '{program}': {reason}")]
    Launch { program: String, reason: String },

    /// The engine process exited with a non-zero status.
    #[error("engine exited with {status}: {stderr}")]
    Crashed { status: String, stderr: String },

    /// The engine produced output that cannot be used as a report.
    #[error("engine produced unusable output: {0}")]
    Output(String),

    /// I/O failure while talking to the engine process.
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}
