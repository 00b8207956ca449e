//! Child-process engine invocation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::{AnalysisEngine, EngineError};

/// Maximum stderr bytes carried into an error message.
const STDERR_TAIL: usize = 4 * 1024;

/// An [`AnalysisEngine`] that shells out to an external executable.
///
/// The configured program is invoked once per scan with its configured
/// arguments followed by the file paths; the XML report is read from stdout.
/// The child process gets no stdin and its stderr is captured for error
/// reporting only.
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandEngine {
    /// Creates an engine wrapper for the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "engine".to_string());
        Self {
            program,
            args: Vec::new(),
            name,
        }
    }

    /// Appends fixed arguments passed before the file list on every scan.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The configured executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl AnalysisEngine for CommandEngine {
    fn scan(&self, files: &[PathBuf]) -> Result<String, EngineError> {
        debug!(
            engine = %self.name,
            files = files.len(),
            "invoking external engine"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(files)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output().map_err(|e| EngineError::Launch {
            program: self.program.display().to_string(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            let tail_start = output.stderr.len().saturating_sub(STDERR_TAIL);
            let stderr = String::from_utf8_lossy(&output.stderr[tail_start..]);
            return Err(EngineError::Crashed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|e| EngineError::Output(format!("report is not valid UTF-8: {}", e)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_launch_error() {
        let engine = CommandEngine::new("/nonexistent/lint-engine");
        let result = engine.scan(&[PathBuf::from("a.cfm")]);

        match result {
            Err(EngineError::Launch { program, .. }) => {
                assert!(program.contains("lint-engine"));
            }
            other => panic!("expected launch error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_nonzero_exit_is_crash_with_stderr() {
        let engine = CommandEngine::new("/bin/sh").with_args(["-c", "echo boom >&2; exit 3"]);
        let result = engine.scan(&[]);

        match result {
            Err(EngineError::Crashed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected crash error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_stdout_is_returned_as_report() {
        let engine = CommandEngine::new("/bin/sh").with_args(["-c", "echo '<issues/>'"]);
        let report = engine.scan(&[]).unwrap();
        assert_eq!(report.trim(), "<issues/>");
    }

    #[test]
    fn test_name_derives_from_program() {
        let engine = CommandEngine::new("/usr/local/bin/cflint");
        assert_eq!(engine.name(), "cflint");
    }
}
