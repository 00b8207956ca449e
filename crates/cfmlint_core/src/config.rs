//! Analyzer configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::AnalyzerError;

/// Error tolerance of a run.
///
/// `Strict` attempts a single batch pass and fails the run outright when it
/// breaks; `Lenient` and `Fragment` skip the all-or-nothing batch pass and
/// analyze files in isolation so one bad file cannot poison the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParsingMode {
    Strict,
    Lenient,
    Fragment,
}

impl ParsingMode {
    /// Parses a mode name; unknown values fall back to `Lenient`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Self::Strict,
            "lenient" => Self::Lenient,
            "fragment" => Self::Fragment,
            "" => Self::Lenient,
            other => {
                warn!(value = other, "unknown parsing mode, using lenient");
                Self::Lenient
            }
        }
    }

    /// Whether the single-batch engine pass should be attempted at all.
    pub fn attempts_batch(self) -> bool {
        matches!(self, Self::Strict)
    }

    /// Whether the run continues past batch failure into isolated analysis.
    pub fn continues_on_error(self) -> bool {
        !matches!(self, Self::Strict)
    }

    /// Success rate (percent) below which the run end logs a warning.
    pub fn recommended_success_threshold(self) -> f64 {
        match self {
            Self::Strict => 100.0,
            Self::Lenient => 85.0,
            Self::Fragment => 70.0,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ParsingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ParsingMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParsingMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// How much of the failure collector's report surfaces in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingLevel {
    None,
    Summary,
    Detailed,
}

impl ReportingLevel {
    /// Parses a level name; unknown values fall back to `Summary`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "summary" => Self::Summary,
            "detailed" => Self::Detailed,
            "" => Self::Summary,
            other => {
                warn!(value = other, "unknown reporting level, using summary");
                Self::Summary
            }
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Summary => "summary",
            Self::Detailed => "detailed",
        }
    }
}

impl Serialize for ReportingLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReportingLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// External engine invocation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable path.
    pub program: Option<PathBuf>,
    /// Fixed arguments passed before the file list.
    pub args: Vec<String>,
}

/// Configuration for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Error tolerance mode.
    pub parsing_mode: ParsingMode,

    /// Whether files that fail to parse only affect the summary (`true`) or
    /// also fail the run status (`false`).
    pub skip_malformed_files: bool,

    /// Failure report verbosity.
    pub error_reporting: ReportingLevel,

    /// Failure-rate percentage above which the run end escalates its log.
    pub error_threshold: u8,

    /// Per-file analysis deadline in seconds.
    pub file_timeout_secs: u64,

    /// Consecutive timeouts that trip the circuit breaker.
    pub max_consecutive_timeouts: u32,

    /// Whether the preprocessing strategy is consulted.
    pub preprocessing: bool,

    /// Whether the fallback strategy is consulted after a failure.
    pub fallback_analysis: bool,

    /// Per-file cap on fallback findings.
    pub fallback_max_issues: usize,

    /// External engine settings.
    pub engine: EngineConfig,

    /// File patterns to include during discovery.
    pub include: Vec<String>,

    /// File patterns to exclude during discovery.
    pub exclude: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            parsing_mode: ParsingMode::Lenient,
            skip_malformed_files: true,
            error_reporting: ReportingLevel::Summary,
            error_threshold: 50,
            file_timeout_secs: 30,
            max_consecutive_timeouts: 10,
            preprocessing: true,
            fallback_analysis: true,
            fallback_max_issues: 50,
            engine: EngineConfig::default(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Loads configuration from a `.cfmlint.jsonc` / `.cfmlint.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AnalyzerError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AnalyzerError::config(format!("failed to read config: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parses configuration from a JSON/JSONC string.
    pub fn from_json(text: &str) -> Result<Self, AnalyzerError> {
        let value = jsonc_parser::parse_to_serde_value(text, &Default::default())
            .map_err(|e| AnalyzerError::config(format!("invalid config: {}", e)))?;

        match value {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| AnalyzerError::config(format!("invalid config: {}", e))),
            None => Ok(Self::default()),
        }
    }

    /// The per-file deadline as a `Duration`.
    pub fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }
}
