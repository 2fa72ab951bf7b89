use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::analysis::{AnalysisContent, AnalysisType};
use crate::fetcher::{ErrorKind, FetchError};

/// One unit of work: a video identifier paired with an analysis type.
///
/// Doubles as the cache key. Equality and hashing cover both fields, so two
/// keys are equal exactly when their inputs are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    pub video_id: String,
    pub analysis: AnalysisType,
}

impl JobKey {
    pub fn new(video_id: impl Into<String>, analysis: AnalysisType) -> Self {
        Self {
            video_id: video_id.into(),
            analysis,
        }
    }

    /// Printable fingerprint of the key.
    ///
    /// The video id is length-prefixed so ids containing separators can never
    /// render the same as a different (id, analysis) pair.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}/{}", self.video_id.len(), self.video_id, self.analysis.as_str())
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.video_id, self.analysis)
    }
}

/// Outcome of a single job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
    Success {
        #[serde(flatten)]
        content: AnalysisContent,
        elapsed: Duration,
        cache_hit: bool,
        attempts: u32,
    },
    Failure {
        error_kind: ErrorKind,
        message: String,
        elapsed: Duration,
        attempts: u32,
    },
}

impl JobResult {
    /// Result served straight from the cache
    pub fn cached(content: AnalysisContent) -> Self {
        JobResult::Success {
            content,
            elapsed: Duration::ZERO,
            cache_hit: true,
            attempts: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }

    pub fn is_cache_hit(&self) -> bool {
        matches!(self, JobResult::Success { cache_hit: true, .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            JobResult::Success { elapsed, .. } | JobResult::Failure { elapsed, .. } => *elapsed,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            JobResult::Success { attempts, .. } | JobResult::Failure { attempts, .. } => *attempts,
        }
    }

    pub fn content(&self) -> Option<&AnalysisContent> {
        match self {
            JobResult::Success { content, .. } => Some(content),
            JobResult::Failure { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.content().map(|content| content.text.as_str())
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            JobResult::Success { .. } => None,
            JobResult::Failure { error_kind, .. } => Some(*error_kind),
        }
    }
}

/// A job paired with its result, as stored in a batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub key: JobKey,
    #[serde(flatten)]
    pub result: JobResult,
}

/// Per-job retry state machine.
///
/// `Pending -> Attempting -> Succeeded`, or `Attempting -> RetryableFailure ->
/// Attempting` while the retry budget lasts, ending in `TerminalFailure`
/// otherwise. `attempt` counts fetches started so far.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    Attempting { attempt: u32 },
    RetryableFailure { attempt: u32, error: FetchError },
    Succeeded { attempt: u32, content: AnalysisContent },
    TerminalFailure { attempt: u32, error: FetchError },
}

impl JobState {
    /// Move the state machine forward after an attempt finished.
    ///
    /// `max_retries` is the number of attempts allowed after the first one.
    pub fn on_attempt_finished(self, outcome: Result<AnalysisContent, FetchError>, max_retries: u32) -> JobState {
        let attempt = match self {
            JobState::Attempting { attempt } => attempt,
            other => return other,
        };

        match outcome {
            Ok(content) => JobState::Succeeded { attempt, content },
            Err(error) if error.kind.is_transient() && attempt <= max_retries => {
                JobState::RetryableFailure { attempt, error }
            }
            Err(error) => JobState::TerminalFailure { attempt, error },
        }
    }

    /// Start the next attempt from `Pending` or `RetryableFailure`
    pub fn begin_attempt(self) -> JobState {
        match self {
            JobState::Pending => JobState::Attempting { attempt: 1 },
            JobState::RetryableFailure { attempt, .. } => JobState::Attempting { attempt: attempt + 1 },
            other => other,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::TerminalFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> FetchError {
        FetchError::new(ErrorKind::RateLimited, "429")
    }

    #[test]
    fn test_fingerprint_is_collision_free_for_separator_ids() {
        let a = JobKey::new("foo_trend", AnalysisType::Analysis);
        let b = JobKey::new("foo", AnalysisType::TrendAnalysis);
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), JobKey::new("foo_trend", AnalysisType::Analysis).fingerprint());
    }

    #[test]
    fn test_cached_result_has_zero_elapsed() {
        let result = JobResult::cached("text".into());
        assert!(result.is_cache_hit());
        assert_eq!(result.text(), Some("text"));
        assert_eq!(result.elapsed(), Duration::ZERO);
        assert_eq!(result.attempts(), 0);
    }

    #[test]
    fn test_success_serializes_flat() {
        let outcome = JobOutcome {
            key: JobKey::new("vid", AnalysisType::Summary),
            result: JobResult::cached("Two words.".into()),
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["text"], "Two words.");
        assert_eq!(json["stats"]["word_count"], 2);
        assert!(json.get("speakers").is_none());

        let back: JobOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_state_machine_retries_transient_until_budget() {
        let mut state = JobState::Pending.begin_attempt();
        assert_eq!(state, JobState::Attempting { attempt: 1 });

        state = state.on_attempt_finished(Err(transient()), 2);
        assert!(matches!(state, JobState::RetryableFailure { attempt: 1, .. }));

        state = state.begin_attempt().on_attempt_finished(Err(transient()), 2);
        assert!(matches!(state, JobState::RetryableFailure { attempt: 2, .. }));

        state = state.begin_attempt().on_attempt_finished(Err(transient()), 2);
        assert!(matches!(state, JobState::TerminalFailure { attempt: 3, .. }));
        assert!(state.is_finished());
    }

    #[test]
    fn test_state_machine_terminal_error_stops_immediately() {
        let state = JobState::Pending
            .begin_attempt()
            .on_attempt_finished(Err(FetchError::new(ErrorKind::Disabled, "off")), 2);
        assert!(matches!(state, JobState::TerminalFailure { attempt: 1, .. }));
    }

    #[test]
    fn test_state_machine_success_after_retry() {
        let state = JobState::Pending
            .begin_attempt()
            .on_attempt_finished(Err(transient()), 2)
            .begin_attempt()
            .on_attempt_finished(Ok("done".into()), 2);
        assert_eq!(
            state,
            JobState::Succeeded {
                attempt: 2,
                content: "done".into()
            }
        );
    }
}
