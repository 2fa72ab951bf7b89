//! YouTube Text Analyzer - fetch video transcripts and wrap them in analysis prompts
//!
//! This library retrieves YouTube transcripts, cleans them up and renders them into
//! analysis-ready content alongside basic text statistics. Batches run on a bounded worker pool that shares a
//! FIFO result cache.

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod config;
pub mod fetcher;
pub mod job;
pub mod output;
pub mod report;
pub mod scheduler;
pub mod stats;
pub mod utils;

pub use analysis::{AnalysisContent, AnalysisType, BuiltinTemplates, TemplateSource};
pub use cache::{CacheStats, ResultCache};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use fetcher::{ErrorKind, FetchAdapter, FetchError, TranscriptSnippet, TranscriptSource};
pub use job::{JobKey, JobOutcome, JobResult};
pub use report::BatchReport;
pub use scheduler::{RetryPolicy, Scheduler};
pub use stats::{SpeakerLines, TextStats};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Errors that abort a whole batch rather than a single job
#[derive(thiserror::Error, Debug)]
pub enum AnalyzerError {
    #[error("Result cache is corrupted: {0}")]
    CacheCorruption(String),

    #[error("Worker pool failure: {0}")]
    WorkerPool(String),
}
