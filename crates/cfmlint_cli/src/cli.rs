//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// cfmlint - robust orchestration around a fragile CFML lint engine
#[derive(Parser)]
#[command(name = "cfmlint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze CFML files
    Analyze(AnalyzeArgs),

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Files or directories to analyze
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Engine executable (overrides the configured one)
    #[arg(long)]
    pub engine: Option<PathBuf>,

    /// Extra argument passed to the engine before the file list (repeatable)
    #[arg(long = "engine-arg", value_name = "ARG")]
    pub engine_args: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Directory for the intermediate result artifact (default: temporary)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Per-file timeout in seconds (overrides config)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Parsing mode (strict, lenient, fragment)
    #[arg(long)]
    pub mode: Option<String>,
}
