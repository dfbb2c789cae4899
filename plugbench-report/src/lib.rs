#![warn(missing_docs)]
//! PlugBench Report - Result Summaries and Console Output
//!
//! Turns a finished run into per-worker and run-level statistics and renders
//! them for the terminal.

mod human;
mod report;

pub use human::{format_duration, format_suite_summary, format_test_header, format_test_report};
pub use report::{SuiteSummary, TestReport, WorkerLine, build_report};
