//! CLI argument parsing for tdat

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the analysis report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tdat")]
#[command(version)]
#[command(
    about = "Thread dump analyzer: correlates threads across dumps with CPU usage samples",
    long_about = None
)]
pub struct Cli {
    /// Thread dump files, in capture order
    #[arg(value_name = "DUMP", required = true)]
    pub dumps: Vec<PathBuf>,

    /// CPU usage sample file, paired with the dump at the same position (repeatable)
    #[arg(short = 'u', long = "usage", value_name = "FILE")]
    pub usages: Vec<PathBuf>,

    /// Thread pool definitions (TOML); defaults to the built-in pool pack
    #[arg(long = "pools", value_name = "FILE")]
    pub pools: Option<PathBuf>,

    /// Classification rules (TOML); defaults to the built-in rule pack
    #[arg(long = "rules", value_name = "FILE", conflicts_with = "no_rules")]
    pub rules: Option<PathBuf>,

    /// Skip risk classification
    #[arg(long = "no-rules")]
    pub no_rules: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
