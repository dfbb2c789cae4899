#![warn(missing_docs)]
//! PlugBench Statistical Engine
//!
//! Integer-nanosecond summaries of recorded call durations:
//! - Per-worker min, max, sum, average and median
//! - Selection-based median, no full sort
//! - Run-level combination across workers

mod median;
mod summary;

pub use median::median_in_place;
pub use summary::{RunStats, WorkerStats, aggregate_run, compute_all, compute_worker_stats};
