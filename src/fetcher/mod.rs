use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod youtube;

use crate::analysis::{render_content, AnalysisContent, BuiltinTemplates, TemplateSource};
use crate::job::JobKey;
use crate::stats::{analyze_text, identify_speakers};
use crate::utils::{clean_transcript, correct_transcription_errors};

/// Why a transcript could not be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The video has no transcript in any usable form
    NoTranscript,
    /// Transcripts are turned off for the video
    Disabled,
    /// The video (or the retrieval service) cannot be reached
    Unavailable,
    /// The retrieval service is throttling us
    RateLimited,
    Unknown,
}

impl ErrorKind {
    /// Transient failures may succeed when attempted again
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoTranscript => "no_transcript",
            ErrorKind::Disabled => "disabled",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single fetch attempt
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One timed piece of a raw transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    pub text: String,
    /// Start offset in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
}

impl TranscriptSnippet {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// Trait for retrieving raw transcripts from an external service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the raw transcript of a video. One attempt, no retries.
    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<TranscriptSnippet>, FetchError>;

    /// Get the name of this source
    fn source_name(&self) -> &'static str;
}

/// A single timed fetch attempt
#[derive(Debug, Clone)]
pub struct Attempt {
    pub outcome: Result<AnalysisContent, FetchError>,
    pub elapsed: Duration,
}

/// Wraps a [`TranscriptSource`] and turns its raw output into analysis content.
///
/// Stateless between calls; safe to share across workers behind an `Arc`.
#[derive(Clone)]
pub struct FetchAdapter {
    source: Arc<dyn TranscriptSource>,
    templates: Arc<dyn TemplateSource>,
    timeout: Option<Duration>,
}

impl FetchAdapter {
    pub fn new(source: Arc<dyn TranscriptSource>) -> Self {
        Self {
            source,
            templates: Arc::new(BuiltinTemplates),
            timeout: None,
        }
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateSource>) -> Self {
        self.templates = templates;
        self
    }

    /// Bound the wall-clock time of each attempt. A timed out attempt is
    /// reported as [`ErrorKind::Unknown`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    /// Run one fetch attempt for `key` and report how long it took
    pub async fn fetch(&self, key: &JobKey) -> Attempt {
        let started = Instant::now();

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.fetch_content(key)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::new(
                    ErrorKind::Unknown,
                    format!("transcript fetch timed out after {}s", limit.as_secs_f64()),
                )),
            },
            None => self.fetch_content(key).await,
        };

        Attempt {
            outcome,
            elapsed: started.elapsed(),
        }
    }

    async fn fetch_content(&self, key: &JobKey) -> Result<AnalysisContent, FetchError> {
        let snippets = self.source.fetch_transcript(&key.video_id).await?;

        let text = correct_transcription_errors(&clean_transcript(&snippets));
        if text.is_empty() {
            return Err(FetchError::new(
                ErrorKind::NoTranscript,
                format!("transcript for {} is empty", key.video_id),
            ));
        }

        // Speaker labels are stripped by cleaning, so group the raw lines
        let speakers = identify_speakers(&snippets);
        let stats = analyze_text(&text);

        let instruction = self.templates.instruction(key.analysis);
        Ok(AnalysisContent::new(
            render_content(&key.video_id, key.analysis, &instruction, &text),
            stats,
            speakers,
        ))
    }
}
