//! Per-worker and run-level summaries
//!
//! All values are integer nanoseconds. Per-worker figures come straight from
//! one timing series; run-level figures combine them:
//! - min/max/sum from ALL workers with samples
//! - avg/median as the unweighted mean over SURVIVING workers, where a worker
//!   with no samples contributes zero

use crate::median::median_in_place;
use rayon::prelude::*;

/// Summary of one worker's durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Fastest call
    pub min: u64,
    /// Slowest call
    pub max: u64,
    /// Total time spent in `run`
    pub sum: u64,
    /// `sum / count`, truncated
    pub avg: u64,
    /// Middle value; mean of the two middles for even counts
    pub median: u64,
    /// Number of samples summarized
    pub count: usize,
}

/// Summary of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Smallest per-worker minimum
    pub min: u64,
    /// Largest per-worker maximum
    pub max: u64,
    /// Sum of every recorded duration
    pub sum: u64,
    /// Mean of per-worker averages
    pub avg: u64,
    /// Mean of per-worker medians
    pub median: u64,
    /// Total samples across workers
    pub count: usize,
    /// Workers that took part, with or without samples
    pub workers: usize,
}

/// Summarize one worker's durations, reordering the slice.
///
/// Returns `None` for an empty series.
pub fn compute_worker_stats(durations: &mut [u64]) -> Option<WorkerStats> {
    let count = durations.len();
    if count == 0 {
        return None;
    }

    let (min, max, sum) = durations.iter().fold(
        (u64::MAX, 0u64, 0u64),
        |(min, max, sum), &d| (min.min(d), max.max(d), sum.saturating_add(d)),
    );
    let median = median_in_place(durations)?;

    Some(WorkerStats {
        min,
        max,
        sum,
        avg: sum / count as u64,
        median,
        count,
    })
}

/// Summarize every worker in parallel, preserving order
pub fn compute_all(series: &mut [Vec<u64>]) -> Vec<Option<WorkerStats>> {
    series
        .par_iter_mut()
        .map(|durations| compute_worker_stats(durations))
        .collect()
}

/// Combine per-worker summaries into run-level figures.
///
/// Returns `None` when no worker recorded anything.
pub fn aggregate_run(workers: &[Option<WorkerStats>]) -> Option<RunStats> {
    let survivors = workers.len() as u64;
    let mut recorded = workers.iter().flatten().peekable();
    recorded.peek()?;

    let mut run = RunStats {
        min: u64::MAX,
        max: 0,
        sum: 0,
        avg: 0,
        median: 0,
        count: 0,
        workers: workers.len(),
    };
    let mut avg_sum: u128 = 0;
    let mut median_sum: u128 = 0;

    for stats in recorded {
        run.min = run.min.min(stats.min);
        run.max = run.max.max(stats.max);
        run.sum = run.sum.saturating_add(stats.sum);
        run.count += stats.count;
        avg_sum += u128::from(stats.avg);
        median_sum += u128::from(stats.median);
    }

    run.avg = (avg_sum / u128::from(survivors)) as u64;
    run.median = (median_sum / u128::from(survivors)) as u64;
    Some(run)
}
