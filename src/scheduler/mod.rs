use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::cache::ResultCache;
use crate::config::BatchConfig;
use crate::fetcher::{FetchAdapter, FetchError};
use crate::job::{JobKey, JobOutcome, JobResult, JobState};
use crate::report::{aggregate, BatchReport};
use crate::AnalyzerError;

/// Retry settings applied to transient fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one
    pub max_retries: u32,
    /// Pause between a failed attempt and the next one
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::ZERO,
        }
    }
}

impl From<&BatchConfig> for RetryPolicy {
    fn from(config: &BatchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Runs batches of jobs on a bounded pool of concurrent fetches.
///
/// The cache is injected by the caller and is the only state shared between
/// workers.
#[derive(Clone)]
pub struct Scheduler {
    adapter: Arc<FetchAdapter>,
    cache: Arc<ResultCache>,
    retry: RetryPolicy,
}

impl Scheduler {
    pub fn new(adapter: FetchAdapter, cache: Arc<ResultCache>) -> Self {
        Self {
            adapter: Arc::new(adapter),
            cache,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Run every job and report the results in submission order.
    ///
    /// Cache hits are answered without touching the fetcher. Misses wait, in
    /// submission order, for one of `concurrency` slots. Per-job failures end
    /// up in the report; only cache corruption or a crashed worker fails the
    /// whole batch.
    pub async fn run_batch(
        &self,
        jobs: Vec<JobKey>,
        concurrency: usize,
    ) -> Result<BatchReport, AnalyzerError> {
        let batch_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("batch", %batch_id, jobs = jobs.len());

        self.run_batch_inner(jobs, concurrency).instrument(span).await
    }

    async fn run_batch_inner(
        &self,
        jobs: Vec<JobKey>,
        concurrency: usize,
    ) -> Result<BatchReport, AnalyzerError> {
        let started = Instant::now();
        let total = jobs.len();
        let concurrency = concurrency.clamp(1, total.max(1));

        tracing::info!(total, concurrency, source = self.adapter.source_name(), "Starting batch");

        let mut slots: Vec<Option<JobResult>> = vec![None; total];
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut workers = JoinSet::new();

        for (index, key) in jobs.iter().enumerate() {
            if let Some(content) = self.cache.get(key) {
                tracing::debug!(index, job = %key, "Cache hit");
                slots[index] = Some(JobResult::cached(content));
                continue;
            }

            // Acquire in the dispatcher so queued jobs start in submission order
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| AnalyzerError::WorkerPool(format!("slot semaphore closed: {}", e)))?;

            // An earlier job for the same key may have finished while we waited
            if let Some(content) = self.cache.peek(key) {
                tracing::debug!(index, job = %key, "Cache filled while queued");
                slots[index] = Some(JobResult::cached(content));
                continue;
            }

            let adapter = Arc::clone(&self.adapter);
            let cache = Arc::clone(&self.cache);
            let retry = self.retry;
            let key = key.clone();

            workers.spawn(
                async move {
                    let result = run_job(&adapter, &cache, &key, retry).await;
                    drop(permit);
                    (index, result)
                }
                .instrument(tracing::debug_span!("job", index)),
            );

            // Surface a fatal worker error without waiting for the whole queue
            while let Some(joined) = workers.try_join_next() {
                Self::collect(joined, &mut slots)?;
            }
        }

        while let Some(joined) = workers.join_next().await {
            Self::collect(joined, &mut slots)?;
        }

        let outcomes = jobs
            .into_iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (key, result))| {
                result
                    .map(|result| JobOutcome { key, result })
                    .ok_or_else(|| AnalyzerError::WorkerPool(format!("job {} produced no result", index)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let report = aggregate(outcomes);

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            cache_hits = report.cache_hits,
            wall_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );

        Ok(report)
    }

    fn collect(
        joined: Result<(usize, Result<JobResult, AnalyzerError>), tokio::task::JoinError>,
        slots: &mut [Option<JobResult>],
    ) -> Result<(), AnalyzerError> {
        let (index, result) = joined.map_err(|e| AnalyzerError::WorkerPool(format!("worker task failed: {}", e)))?;
        slots[index] = Some(result?);
        Ok(())
    }
}

/// Drive one job through its retry state machine
async fn run_job(
    adapter: &FetchAdapter,
    cache: &ResultCache,
    key: &JobKey,
    retry: RetryPolicy,
) -> Result<JobResult, AnalyzerError> {
    let mut state = JobState::Pending;
    let mut elapsed = Duration::ZERO;

    loop {
        state = state.begin_attempt();

        let attempt = adapter.fetch(key).await;
        elapsed += attempt.elapsed;

        state = state.on_attempt_finished(attempt.outcome, retry.max_retries);

        match state {
            JobState::Succeeded { attempt, content } => {
                cache.put(key.clone(), content.clone())?;
                tracing::debug!(job = %key, attempt, elapsed_ms = elapsed.as_millis() as u64, "Job succeeded");
                return Ok(JobResult::Success {
                    content,
                    elapsed,
                    cache_hit: false,
                    attempts: attempt,
                });
            }
            JobState::TerminalFailure {
                attempt,
                error: FetchError { kind, message },
            } => {
                tracing::warn!(job = %key, attempt, error_kind = %kind, "Job failed: {}", message);
                return Ok(JobResult::Failure {
                    error_kind: kind,
                    message,
                    elapsed,
                    attempts: attempt,
                });
            }
            JobState::RetryableFailure { attempt, ref error } => {
                tracing::info!(job = %key, attempt, error_kind = %error.kind, "Transient failure, retrying");
                if !retry.delay.is_zero() {
                    tokio::time::sleep(retry.delay).await;
                }
            }
            JobState::Pending | JobState::Attempting { .. } => {
                return Err(AnalyzerError::WorkerPool(format!(
                    "job {} stalled in state {:?}",
                    key, state
                )));
            }
        }
    }
}
