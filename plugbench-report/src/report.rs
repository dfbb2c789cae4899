//! Report Data Structures

use chrono::{DateTime, Utc};
use plugbench_core::{RunResult, StopPhase, ThreadAssignment};
use plugbench_stats::{RunStats, WorkerStats, aggregate_run, compute_all};
use std::time::Duration;

/// Everything printed for one completed test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    /// Test display name
    pub name: String,
    /// Threads the definition asked for
    pub requested: usize,
    /// One entry per surviving worker, in thread order
    pub workers: Vec<WorkerLine>,
    /// Run-level figures; `None` when no worker recorded a sample
    pub run: Option<RunStats>,
    /// Wall time from barrier release to the last join
    pub elapsed: Duration,
}

/// One worker row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLine {
    /// One-based thread number as shown in the report
    pub id: usize,
    /// Initializer and context label
    pub assignment: ThreadAssignment,
    /// `None` renders as N/A
    pub stats: Option<WorkerStats>,
    /// Early stop, if any
    pub stopped_by: Option<StopPhase>,
}

impl TestReport {
    /// Threads the plugin refused
    pub fn dropped(&self) -> usize {
        self.requested.saturating_sub(self.workers.len())
    }

    /// Sum of every measured `run` call
    pub fn run_time_ns(&self) -> u64 {
        self.run.map_or(0, |r| r.sum)
    }
}

/// Summarize a finished run
pub fn build_report(result: &RunResult) -> TestReport {
    let mut durations: Vec<Vec<u64>> = result
        .workers
        .iter()
        .map(|w| w.series.durations())
        .collect();
    let stats = compute_all(&mut durations);
    let run = aggregate_run(&stats);

    let workers = result
        .workers
        .iter()
        .zip(stats)
        .map(|(worker, stats)| WorkerLine {
            id: worker.index + 1,
            assignment: worker.assignment.clone(),
            stats,
            stopped_by: worker.stopped_by,
        })
        .collect();

    TestReport {
        name: result.test_name.clone(),
        requested: result.requested,
        workers,
        run,
        elapsed: result.elapsed,
    }
}

/// Outcome counts for a whole suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteSummary {
    /// When the suite started
    pub started: DateTime<Utc>,
    /// Test definitions selected by the filter
    pub total: usize,
    /// Tests that ran to completion
    pub completed: usize,
    /// Tests skipped because no worker could run
    pub skipped: usize,
    /// Tests whose plugin failed to load
    pub load_failures: usize,
}

impl SuiteSummary {
    /// Empty summary stamped with the current time
    pub fn start(total: usize) -> Self {
        Self {
            started: Utc::now(),
            total,
            completed: 0,
            skipped: 0,
            load_failures: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugbench_core::{Sample, TimingSeries, WorkerResult};

    fn worker(index: usize, durations: &[u64]) -> WorkerResult {
        WorkerResult {
            index,
            assignment: ThreadAssignment::default(),
            series: TimingSeries::from_samples(
                durations
                    .iter()
                    .map(|&d| Sample {
                        timestamp_ns: 0,
                        duration_ns: d,
                    })
                    .collect(),
            ),
            stopped_by: None,
        }
    }

    #[test]
    fn test_build_report() {
        let result = RunResult {
            test_name: "spin".into(),
            requested: 3,
            workers: vec![worker(0, &[10, 30, 20]), worker(2, &[])],
            elapsed: Duration::from_millis(2),
        };
        let report = build_report(&result);

        assert_eq!(report.dropped(), 1);
        assert_eq!(report.workers[0].id, 1);
        assert_eq!(report.workers[1].id, 3);
        assert_eq!(report.workers[0].stats.unwrap().median, 20);
        assert!(report.workers[1].stats.is_none());

        let run = report.run.unwrap();
        assert_eq!(run.avg, 10);
        assert_eq!(report.run_time_ns(), 60);
    }

    #[test]
    fn test_all_empty_run_is_not_available() {
        let result = RunResult {
            test_name: "idle".into(),
            requested: 1,
            workers: vec![worker(0, &[])],
            elapsed: Duration::ZERO,
        };
        let report = build_report(&result);
        assert!(report.run.is_none());
        assert_eq!(report.run_time_ns(), 0);
    }
}
