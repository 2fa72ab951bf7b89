use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::job::JobOutcome;

/// Results of one batch, in submission order, with aggregate counters
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<JobOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful jobs answered from the cache
    pub cache_hits: usize,
    /// Sum of per-job elapsed time
    pub total_elapsed: Duration,
    /// Mean elapsed time over successful jobs; `None` when nothing succeeded
    pub average_elapsed: Option<Duration>,
    pub created_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Successful outcomes in submission order
    pub fn successes(&self) -> impl Iterator<Item = &JobOutcome> {
        self.results.iter().filter(|outcome| outcome.result.is_success())
    }

    /// Failed outcomes in submission order
    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.results.iter().filter(|outcome| !outcome.result.is_success())
    }
}

/// Fold per-job outcomes into a report.
///
/// Pure apart from stamping `created_at`; the counters depend only on the
/// input sequence.
pub fn aggregate(results: Vec<JobOutcome>) -> BatchReport {
    let mut succeeded = 0usize;
    let mut cache_hits = 0usize;
    let mut total_elapsed = Duration::ZERO;
    let mut success_elapsed = Duration::ZERO;

    for outcome in &results {
        let elapsed = outcome.result.elapsed();
        total_elapsed += elapsed;

        if outcome.result.is_success() {
            succeeded += 1;
            success_elapsed += elapsed;
            if outcome.result.is_cache_hit() {
                cache_hits += 1;
            }
        }
    }

    let average_elapsed = u32::try_from(succeeded)
        .ok()
        .filter(|&count| count > 0)
        .map(|count| success_elapsed / count);

    BatchReport {
        failed: results.len() - succeeded,
        results,
        succeeded,
        cache_hits,
        total_elapsed,
        average_elapsed,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisType;
    use crate::fetcher::ErrorKind;
    use crate::job::{JobKey, JobResult};

    fn success(id: &str, ms: u64, cache_hit: bool) -> JobOutcome {
        JobOutcome {
            key: JobKey::new(id, AnalysisType::Summary),
            result: JobResult::Success {
                content: format!("text for {id}").into(),
                elapsed: Duration::from_millis(ms),
                cache_hit,
                attempts: if cache_hit { 0 } else { 1 },
            },
        }
    }

    fn failure(id: &str, ms: u64) -> JobOutcome {
        JobOutcome {
            key: JobKey::new(id, AnalysisType::Summary),
            result: JobResult::Failure {
                error_kind: ErrorKind::Unavailable,
                message: "gone".into(),
                elapsed: Duration::from_millis(ms),
                attempts: 1,
            },
        }
    }

    #[test]
    fn test_counts_and_average_over_successes_only() {
        let report = aggregate(vec![success("a", 100, false), failure("b", 1000), success("c", 300, false)]);

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total_elapsed, Duration::from_millis(1400));
        assert_eq!(report.average_elapsed, Some(Duration::from_millis(200)));
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_no_successes_has_no_average() {
        let report = aggregate(vec![failure("a", 10), failure("b", 20)]);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.average_elapsed, None);
        assert_eq!(report.total_elapsed, Duration::from_millis(30));
    }

    #[test]
    fn test_preserves_input_order_and_counts_cache_hits() {
        let report = aggregate(vec![failure("x", 5), success("y", 0, true), success("z", 40, false)]);

        let ids: Vec<_> = report.results.iter().map(|o| o.key.video_id.as_str()).collect();
        assert_eq!(ids, ["x", "y", "z"]);
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.successes().count(), 2);
    }

    #[test]
    fn test_deterministic_counters() {
        let input = vec![success("a", 7, false), failure("b", 3)];
        let first = aggregate(input.clone());
        let second = aggregate(input);
        assert_eq!(first.results, second.results);
        assert_eq!(first.total_elapsed, second.total_elapsed);
        assert_eq!(first.average_elapsed, second.average_elapsed);
    }
}
