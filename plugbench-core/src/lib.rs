#![warn(missing_docs)]
//! PlugBench Core - Plugin Host and Worker Runtime
//!
//! This crate loads native test modules and drives them:
//! - `PluginHost` for module loading, ABI checks and instance creation
//! - `ContextPool` for contexts shared between workers
//! - `run_test` for barrier-aligned multi-threaded sampling
//! - CPU affinity pinning for stable per-core timings

mod barrier;
mod context;
mod error;
mod host;
mod measure;
mod runner;
mod sampler;
mod slot;
mod test_spec;

#[cfg(test)]
mod testing;

pub use barrier::StartBarrier;
pub use context::{ContextHandle, ContextPool};
pub use error::{LoadError, RunError};
pub use host::{PluginHost, PluginPaths, TestFactory, TestInstance, compose_initializer};
pub use measure::{nanos_between, pin_to_cpu};
pub use runner::{RunOptions, RunResult, WorkerResult, run_test};
pub use sampler::{StopPhase, run_sampler};
pub use slot::{Sample, TimingSeries, WorkerSlot};
pub use test_spec::{TestSpec, ThreadAssignment, ThreadOverride};
