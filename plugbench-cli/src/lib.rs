#![warn(missing_docs)]
//! PlugBench CLI Library
//!
//! Argument parsing, suite loading and the suite loop. The `plugbench` binary
//! calls [`run`].
//!
//! ```text
//! <exe dir>/
//! ├── plugbench
//! ├── config.yaml        --config
//! └── tests/             --plugins-dir
//!     ├── libplugin_empty.so
//!     └── libplugin_spin.so
//! ```

mod config;
mod planner;

pub use config::{ConfigError, DEFAULT_SAMPLES, TestSuite};
pub use planner::{ExecutionPlan, build_plan};

use anyhow::Context;
use clap::Parser;
use plugbench_core::{PluginHost, PluginPaths, RunOptions, TestSpec, run_test};
use plugbench_report::{
    SuiteSummary, TestReport, build_report, format_suite_summary, format_test_header,
    format_test_report,
};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// PlugBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "plugbench")]
#[command(author, version, about = "PlugBench - latency benchmarks for native test plugins")]
pub struct Cli {
    /// Filter tests by regex pattern on their name
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Suite file (default: config.yaml next to the executable)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory of plugin modules (default: tests/ next to the executable)
    #[arg(long)]
    pub plugins_dir: Option<PathBuf>,

    /// List the selected tests without running them
    #[arg(long)]
    pub list: bool,

    /// Override the sample budget of every test
    #[arg(long, short = 'n')]
    pub samples: Option<usize>,

    /// Override the thread count of every test
    #[arg(long, short = 'c')]
    pub concurrency: Option<usize>,

    /// Pin each worker thread to its own core
    #[arg(long)]
    pub pin_threads: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the PlugBench CLI with the process arguments.
///
/// # Returns
/// `Err` only for configuration problems; failed tests are reported and
/// skipped.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the PlugBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "plugbench=debug"
        } else {
            "plugbench=info"
        })
        .with_writer(std::io::stderr)
        .init();

    let exe_dir = executable_dir()?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| exe_dir.join("config.yaml"));
    let paths = PluginPaths::new(
        cli.plugins_dir
            .clone()
            .unwrap_or_else(|| exe_dir.join("tests")),
    );
    debug!(config = %config_path.display(), plugins = %paths.plugins_dir().display(), "paths resolved");

    let mut suite = TestSuite::load(&config_path)
        .with_context(|| format!("Failed to load suite from {}", config_path.display()))?;
    suite.apply_overrides(cli.samples, cli.concurrency);

    let filter = Regex::new(&cli.filter)
        .with_context(|| format!("Invalid filter pattern `{}`", cli.filter))?;
    let plan = build_plan(&suite.tests, Some(&filter));

    if cli.list {
        list_tests(&plan);
        return Ok(());
    }

    if plan.tests.is_empty() {
        println!("No tests selected.");
        return Ok(());
    }

    let options = RunOptions {
        pin_threads: cli.pin_threads,
    };
    let summary = run_suite(&plan, &paths, &options);
    print!("{}", format_suite_summary(&summary));
    Ok(())
}

fn executable_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    Ok(exe.parent().map(Path::to_path_buf).unwrap_or_default())
}

fn list_tests(plan: &ExecutionPlan<'_>) {
    println!("PlugBench Plan:");
    for test in &plan.tests {
        println!(
            "├── {} ({}, {} threads, {} samples)",
            test.name, test.module, test.concurrency, test.samples
        );
    }
    println!("{} tests found.", plan.tests.len());
}

/// Run every planned test in order. Load and run failures are logged and
/// counted; the suite always continues.
pub fn run_suite(
    plan: &ExecutionPlan<'_>,
    paths: &PluginPaths,
    options: &RunOptions,
) -> SuiteSummary {
    let mut summary = SuiteSummary::start(plan.tests.len());
    info!(tests = plan.tests.len(), "suite started");

    for &spec in &plan.tests {
        let host = match PluginHost::load(paths, &spec.module, &spec.initializer) {
            Ok(host) => host,
            Err(e) => {
                error!(test = %spec.name, error = %e, "failed to load plugin");
                summary.load_failures += 1;
                continue;
            }
        };

        if run_one(&host, spec, options) {
            summary.completed += 1;
        } else {
            summary.skipped += 1;
        }
    }

    summary
}

/// Run and print one test against an already-loaded factory. Returns whether
/// the test completed.
fn run_one(host: &PluginHost, spec: &TestSpec, options: &RunOptions) -> bool {
    match run_test(host, spec, options) {
        Ok(result) => {
            print!("{}", render_test(&build_report(&result), spec.samples));
            true
        }
        Err(e) => {
            warn!(test = %spec.name, error = %e, "test skipped");
            false
        }
    }
}

/// Header and report of a finished run. The header counts the threads that
/// survived setup.
fn render_test(report: &TestReport, samples: usize) -> String {
    let mut output = format_test_header(&report.name, report.workers.len(), samples);
    output.push_str(&format_test_report(report));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugbench_core::ThreadAssignment;
    use plugbench_report::WorkerLine;
    use std::time::Duration;

    #[test]
    fn test_header_counts_surviving_threads() {
        let line = |id| WorkerLine {
            id,
            assignment: ThreadAssignment::default(),
            stats: None,
            stopped_by: None,
        };
        let report = TestReport {
            name: "partial".into(),
            requested: 3,
            workers: vec![line(1), line(3)],
            run: None,
            elapsed: Duration::from_millis(1),
        };

        let text = render_test(&report, 500);
        assert!(text.contains("Test \"partial\" started: 2 threads, 500 samples"));
        assert!(text.contains("1 of 3 threads dropped"));
    }
}
