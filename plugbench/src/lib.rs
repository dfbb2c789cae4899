#![warn(missing_docs)]
//! # PlugBench
//!
//! Latency benchmarks for native test plugins.
//!
//! PlugBench loads shared libraries that export a small C ABI, runs each test
//! on N barrier-aligned threads, and reports per-call latency:
//! - **Plugin ABI**: versioned `bt_*` exports with a `#[repr(C)]` vtable
//! - **Plugin SDK**: safe `BenchPlugin` / `BenchTest` traits and `export_plugin!`
//! - **Shared Contexts**: plugin resources deduplicated per initializer string
//! - **Aligned Start**: every worker is released by one rendezvous barrier
//! - **Integer Statistics**: min/max/avg/median in nanoseconds, no floats
//!
//! ## Writing a Plugin
//!
//! ```ignore
//! use plugbench::sdk::{BenchPlugin, BenchTest};
//! use std::sync::Arc;
//!
//! struct Empty;
//!
//! impl BenchTest for Empty {
//!     fn run(&mut self) -> bool {
//!         true
//!     }
//! }
//!
//! struct EmptyPlugin;
//!
//! impl BenchPlugin for EmptyPlugin {
//!     type Test = Empty;
//!     type Context = ();
//!
//!     fn create_test(_init: &str, _ctx: Option<Arc<()>>) -> Option<Empty> {
//!         Some(Empty)
//!     }
//! }
//!
//! plugbench::export_plugin!(EmptyPlugin);
//! ```
//!
//! ## Running a Suite
//!
//! ```text
//! plugbench --config config.yaml --plugins-dir target/release 'spin.*'
//! ```

// Re-export the ABI and SDK
pub use plugbench_abi::{BENCH_ABI_VERSION, PluginTable, export_plugin, sdk};

// Re-export core types
pub use plugbench_core::{
    ContextHandle, LoadError, PluginHost, PluginPaths, RunError, RunOptions, RunResult, Sample,
    StopPhase, TestFactory, TestInstance, TestSpec, ThreadAssignment, ThreadOverride,
    TimingSeries, WorkerResult, run_test,
};

// Re-export stats
pub use plugbench_stats::{RunStats, WorkerStats, aggregate_run, compute_worker_stats};

// Re-export reporting
pub use plugbench_report::{TestReport, build_report, format_duration, format_test_report};

// Re-export CLI
pub use plugbench_cli::{Cli, ConfigError, TestSuite, run, run_with_cli};
