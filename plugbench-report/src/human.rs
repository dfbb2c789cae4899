//! Output Formatting
//!
//! Human-readable terminal output:
//!
//! ```text
//! ======================================================================
//! Test "spin" started: 2 threads, 1000 samples
//! Test "spin" completed in 1.204 ms:
//!
//!   [ 1] min/max/avg/med =     120 ns /   3.870 µs /     251 ns /     240 ns / (db=main) iters=100
//!   [ 2] min/max/avg/med =                                                   / iters=200
//!   [**] min/max/avg/med =     120 ns /   3.870 µs /     125 ns /     120 ns / -
//!
//! Test "spin" summ run time 251.000 µs
//! ======================================================================
//! ```

use crate::report::{SuiteSummary, TestReport, WorkerLine};
use std::fmt::Write;
use std::time::Duration;

const RULE_WIDTH: usize = 86;

/// Render nanoseconds with an adaptive unit.
///
/// Below 1 µs the integer value is shown in ns; above that three decimals in
/// µs, ms or s.
pub fn format_duration(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{nanos} ns")
    } else if nanos < 1_000_000 {
        format!("{:.3} µs", nanos as f64 / 1e3)
    } else if nanos < 1_000_000_000 {
        format!("{:.3} ms", nanos as f64 / 1e6)
    } else {
        format!("{:.3} s", nanos as f64 / 1e9)
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format_duration(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
}

/// Banner printed before a test starts
pub fn format_test_header(name: &str, threads: usize, samples: usize) -> String {
    let mut output = String::new();
    output.push_str(&"=".repeat(RULE_WIDTH));
    output.push('\n');
    let _ = writeln!(
        output,
        "Test \"{name}\" started: {threads} threads, {samples} samples"
    );
    output
}

fn stats_columns(min: u64, max: u64, avg: u64, median: u64) -> String {
    format!(
        "{:>10} / {:>10} / {:>10} / {:>10} / ",
        format_duration(min),
        format_duration(max),
        format_duration(avg),
        format_duration(median)
    )
}

fn worker_line(output: &mut String, line: &WorkerLine) {
    let _ = write!(output, "  [{:>2}] min/max/avg/med = ", line.id);
    match &line.stats {
        Some(s) => output.push_str(&stats_columns(s.min, s.max, s.avg, s.median)),
        None => {
            let _ = write!(output, "{:>52}", "/ ");
        }
    }
    let _ = write!(output, "{}", line.assignment);
    if let Some(phase) = line.stopped_by {
        let samples = line.stats.map_or(0, |s| s.count);
        let _ = write!(output, "  (stopped in {phase} after {samples} samples)");
    }
    output.push('\n');
}

/// Per-worker rows, the run-level row and the closing totals
pub fn format_test_report(report: &TestReport) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Test \"{}\" completed in {}:",
        report.name,
        format_elapsed(report.elapsed)
    );
    if report.dropped() > 0 {
        let _ = writeln!(
            output,
            "  ({} of {} threads dropped: instance creation failed)",
            report.dropped(),
            report.requested
        );
    }
    output.push('\n');

    for line in &report.workers {
        worker_line(&mut output, line);
    }

    match &report.run {
        Some(run) => {
            let _ = writeln!(
                output,
                "  [**] min/max/avg/med = {}-",
                stats_columns(run.min, run.max, run.avg, run.median)
            );
        }
        None => output.push_str("  [**] min/max/avg/med = N/A\n"),
    }

    let _ = writeln!(
        output,
        "\nTest \"{}\" summ run time {}",
        report.name,
        format_duration(report.run_time_ns())
    );
    output.push_str(&"=".repeat(RULE_WIDTH));
    output.push('\n');
    output
}

/// Closing suite summary
pub fn format_suite_summary(summary: &SuiteSummary) -> String {
    let mut output = String::new();
    output.push('\n');
    output.push_str("PlugBench Summary\n");
    output.push_str(&"-".repeat(RULE_WIDTH));
    output.push('\n');
    let _ = writeln!(
        output,
        "  started:       {}",
        summary.started.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(output, "  tests:         {}", summary.total);
    let _ = writeln!(output, "  completed:     {}", summary.completed);
    let _ = writeln!(output, "  skipped:       {}", summary.skipped);
    let _ = writeln!(output, "  load failures: {}", summary.load_failures);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use plugbench_core::{StopPhase, ThreadAssignment};
    use plugbench_stats::{RunStats, WorkerStats};

    #[test]
    fn test_format_duration_boundaries() {
        assert_eq!(format_duration(0), "0 ns");
        assert_eq!(format_duration(999), "999 ns");
        assert_eq!(format_duration(1_000), "1.000 µs");
        assert_eq!(format_duration(1_500), "1.500 µs");
        assert_eq!(format_duration(999_999), "999.999 µs");
        assert_eq!(format_duration(1_000_000), "1.000 ms");
        assert_eq!(format_duration(2_345_678), "2.346 ms");
        assert_eq!(format_duration(1_000_000_000), "1.000 s");
        assert_eq!(format_duration(90_000_000_000), "90.000 s");
    }

    fn sample_report() -> TestReport {
        let stats = WorkerStats {
            min: 100,
            max: 2_000,
            sum: 3_000,
            avg: 300,
            median: 250,
            count: 10,
        };
        TestReport {
            name: "spin".into(),
            requested: 3,
            workers: vec![
                WorkerLine {
                    id: 1,
                    assignment: ThreadAssignment {
                        initializer: "iters=10".into(),
                        context: "db=main".into(),
                    },
                    stats: Some(stats),
                    stopped_by: None,
                },
                WorkerLine {
                    id: 2,
                    assignment: ThreadAssignment::default(),
                    stats: None,
                    stopped_by: Some(StopPhase::RunBefore),
                },
            ],
            run: Some(RunStats {
                min: 100,
                max: 2_000,
                sum: 3_000,
                avg: 150,
                median: 125,
                count: 10,
                workers: 2,
            }),
            elapsed: Duration::from_micros(1_250),
        }
    }

    #[test]
    fn test_worker_rows() {
        let text = format_test_report(&sample_report());

        assert!(text.contains("Test \"spin\" completed in 1.250 ms:"));
        assert!(text.contains(
            "  [ 1] min/max/avg/med =     100 ns /   2.000 µs /     300 ns /     250 ns / (db=main) iters=10\n"
        ));
        assert!(text.contains("  [**] min/max/avg/med =     100 ns /   2.000 µs /     150 ns /     125 ns / -\n"));
        assert!(text.contains("summ run time 3.000 µs"));
        assert!(text.contains("1 of 3 threads dropped"));
    }

    #[test]
    fn test_empty_worker_renders_not_available() {
        let text = format_test_report(&sample_report());
        let row = text.lines().find(|l| l.starts_with("  [ 2]")).unwrap();

        assert!(row.contains(&format!("{:>52}-", "/ ")));
        assert!(row.contains("stopped in RunBefore after 0 samples"));
        assert!(!row.contains("0 ns"));
    }

    #[test]
    fn test_run_not_available() {
        let mut report = sample_report();
        report.run = None;
        let text = format_test_report(&report);
        assert!(text.contains("  [**] min/max/avg/med = N/A\n"));
    }

    #[test]
    fn test_header_and_summary() {
        let header = format_test_header("empty", 4, 1000);
        assert!(header.ends_with("Test \"empty\" started: 4 threads, 1000 samples\n"));

        let summary = SuiteSummary {
            started: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            total: 3,
            completed: 2,
            skipped: 0,
            load_failures: 1,
        };
        let text = format_suite_summary(&summary);
        assert!(text.contains("started:       2024-05-01 12:30:00 UTC"));
        assert!(text.contains("load failures: 1"));
    }
}
