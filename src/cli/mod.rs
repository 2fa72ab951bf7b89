use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::analysis::AnalysisType;

#[derive(Parser)]
#[command(
    name = "ytanalyze",
    about = "YouTube Text Analyzer - Fetch transcripts and build analysis-ready content",
    version,
    long_about = "Fetches YouTube transcripts for one or many videos, cleans them up and wraps them in an \
                  analysis prompt. Batches run concurrently and share an in-memory result cache."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch transcripts and render analysis content for one or more videos
    Analyze {
        /// YouTube URLs or 11-character video ids
        #[arg(value_name = "URL_OR_ID")]
        inputs: Vec<String>,

        /// Analysis type (uses the configured default if not specified)
        #[arg(short = 't', long = "type", value_enum, value_name = "TYPE")]
        analysis: Option<AnalysisType>,

        /// Maximum concurrent fetches (uses the configured default if not specified)
        #[arg(short, long, value_name = "COUNT")]
        workers: Option<usize>,

        /// Read additional inputs from a file, one per line
        #[arg(long, value_name = "FILE")]
        from_file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print cache statistics after the batch
        #[arg(long)]
        cache_stats: bool,
    },

    /// List available analysis types
    Types,

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Per-video status summary
    Text,
    /// Full batch report as JSON
    Json,
    /// Combined analysis content of every successful video
    Content,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Content => write!(f, "content"),
        }
    }
}
