//! Concurrency Core
//!
//! Runs one test definition across N worker threads in three phases:
//!
//! ```text
//! setup     (coordinator)  contexts resolved, instances created,
//!                          refused threads dropped
//!     │
//! execute   (N workers)    spawn "{test}-{index}", allocate series,
//!                          wait on StartBarrier ── coordinator releases
//!                          and records the start instant
//!                          sample loop, join
//!     │
//! teardown  (coordinator)  release every instance, then destroy contexts
//! ```
//!
//! Each phase consumes the previous one, so teardown order cannot be skipped.

use crate::barrier::StartBarrier;
use crate::context::ContextPool;
use crate::error::RunError;
use crate::host::{TestFactory, TestInstance};
use crate::measure::pin_to_cpu;
use crate::sampler::{StopPhase, run_sampler};
use crate::slot::{TimingSeries, WorkerSlot};
use crate::test_spec::{TestSpec, ThreadAssignment};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Knobs for a single run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Pin worker `k` to core `k % available cores`
    pub pin_threads: bool,
}

/// Measurements of one surviving worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResult {
    /// Zero-based thread index within the test definition
    pub index: usize,
    /// Initializer and context the instance was created with
    pub assignment: ThreadAssignment,
    /// Recorded samples
    pub series: TimingSeries,
    /// Capability that stopped the loop before the budget was spent
    pub stopped_by: Option<StopPhase>,
}

/// Outcome of one test definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Test display name
    pub test_name: String,
    /// Number of threads the definition asked for
    pub requested: usize,
    /// Surviving workers in thread index order
    pub workers: Vec<WorkerResult>,
    /// Wall time from release to the last join
    pub elapsed: Duration,
}

impl RunResult {
    /// Threads dropped because the plugin refused an instance
    pub fn dropped(&self) -> usize {
        self.requested.saturating_sub(self.workers.len())
    }
}

/// Run `spec` against `factory` and collect per-worker timings.
///
/// Fails only when no instance could be created or a worker thread could
/// not be spawned. Instances are released and contexts destroyed on every
/// path.
pub fn run_test<F: TestFactory + ?Sized>(
    factory: &F,
    spec: &TestSpec,
    options: &RunOptions,
) -> Result<RunResult, RunError> {
    let prepared = PreparedRun::setup(factory, spec)?;
    let joined = prepared.execute(options)?;
    Ok(joined.teardown())
}

struct PreparedRun<'f, F: TestFactory + ?Sized> {
    test_name: String,
    requested: usize,
    // Field order is drop order: instances go before their contexts.
    slots: Vec<WorkerSlot<'f>>,
    pool: ContextPool<'f, F>,
}

impl<'f, F: TestFactory + ?Sized> PreparedRun<'f, F> {
    fn setup(factory: &'f F, spec: &TestSpec) -> Result<Self, RunError> {
        let mut pool = ContextPool::new(factory);
        let mut slots = Vec::with_capacity(spec.concurrency);

        for index in 0..spec.concurrency {
            let assignment = spec.assignment(index);
            let context = pool.resolve(&assignment.context);
            if context.is_none() && !assignment.context.is_empty() {
                debug!(test = %spec.name, thread = index, "plugin returned no context");
            }

            match factory.create_test(&assignment.initializer, context) {
                Some(instance) => {
                    slots.push(WorkerSlot::new(
                        index,
                        assignment,
                        context,
                        spec.samples,
                        instance,
                    ));
                }
                None => warn!(
                    test = %spec.name,
                    thread = index,
                    initializer = %assignment,
                    "plugin refused test instance, dropping thread"
                ),
            }
        }

        if slots.is_empty() {
            return Err(RunError::NoInstances {
                requested: spec.concurrency,
            });
        }

        debug!(
            test = %spec.name,
            workers = slots.len(),
            contexts = pool.len(),
            "setup complete"
        );

        Ok(Self {
            test_name: spec.name.clone(),
            requested: spec.concurrency,
            slots,
            pool,
        })
    }

    fn execute(self, options: &RunOptions) -> Result<JoinedRun<'f, F>, RunError> {
        let PreparedRun {
            test_name,
            requested,
            slots,
            pool,
        } = self;

        let barrier = StartBarrier::new(slots.len() + 1);
        let cores = thread::available_parallelism().map_or(1, |n| n.get());

        let joined = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(slots.len());
            for (position, slot) in slots.into_iter().enumerate() {
                let index = slot.index;
                let assignment = slot.assignment.clone();
                let core = options.pin_threads.then_some(position % cores);
                let barrier = &barrier;

                let spawned = thread::Builder::new()
                    .name(format!("{test_name}-{index}"))
                    .spawn_scoped(scope, move || worker_main(slot, barrier, core));

                match spawned {
                    Ok(handle) => handles.push((index, assignment, handle)),
                    Err(source) => {
                        barrier.abort();
                        return Err(RunError::Spawn { index, source });
                    }
                }
            }

            let Some(start) = barrier.release() else {
                return Err(RunError::NoInstances { requested });
            };

            let mut results = Vec::with_capacity(handles.len());
            let mut instances = Vec::with_capacity(handles.len());
            for (index, assignment, handle) in handles {
                match handle.join() {
                    Ok(outcome) => {
                        results.push(outcome.result);
                        instances.push(outcome.instance);
                    }
                    Err(_) => {
                        warn!(test = %test_name, thread = index, "worker thread panicked");
                        results.push(WorkerResult {
                            index,
                            assignment,
                            series: TimingSeries::default(),
                            stopped_by: None,
                        });
                    }
                }
            }
            Ok((results, instances, start.elapsed()))
        });

        // On error `pool` drops here, after every instance is gone with its thread.
        let (results, instances, elapsed) = joined?;
        Ok(JoinedRun {
            test_name,
            requested,
            results,
            instances,
            pool,
            elapsed,
        })
    }
}

struct WorkerOutcome<'f> {
    result: WorkerResult,
    instance: Box<dyn TestInstance + 'f>,
}

/// Arrival at the start barrier that still counts if the worker unwinds first
struct Arrival<'b> {
    barrier: &'b StartBarrier,
    pending: bool,
}

impl<'b> Arrival<'b> {
    fn new(barrier: &'b StartBarrier) -> Self {
        Self {
            barrier,
            pending: true,
        }
    }

    fn wait(mut self) -> Option<Instant> {
        self.pending = false;
        self.barrier.wait()
    }
}

impl Drop for Arrival<'_> {
    fn drop(&mut self) {
        if self.pending {
            self.barrier.leave();
        }
    }
}

fn worker_main<'f>(
    slot: WorkerSlot<'f>,
    barrier: &StartBarrier,
    core: Option<usize>,
) -> WorkerOutcome<'f> {
    let arrival = Arrival::new(barrier);

    if let Some(core) = core {
        if let Err(e) = pin_to_cpu(core) {
            warn!(core, error = %e, "failed to pin worker thread");
        }
    }

    let WorkerSlot {
        index,
        assignment,
        context,
        sample_budget,
        mut instance,
    } = slot;

    let series = match TimingSeries::allocate(sample_budget) {
        Ok(series) => Some(series),
        Err(e) => {
            warn!(
                thread = index,
                budget = sample_budget,
                error = %e,
                "cannot allocate sample buffer, worker records nothing"
            );
            None
        }
    };

    let (series, stopped_by) = match (series, arrival.wait()) {
        (Some(mut series), Some(epoch)) => {
            let stopped_by = run_sampler(instance.as_mut(), &mut series, epoch);
            (series, stopped_by)
        }
        _ => (TimingSeries::default(), None),
    };

    if let Some(phase) = stopped_by {
        debug!(
            thread = index,
            context = context.get(),
            samples = series.len(),
            %phase,
            "worker stopped early"
        );
    }

    WorkerOutcome {
        result: WorkerResult {
            index,
            assignment,
            series,
            stopped_by,
        },
        instance,
    }
}

struct JoinedRun<'f, F: TestFactory + ?Sized> {
    test_name: String,
    requested: usize,
    results: Vec<WorkerResult>,
    instances: Vec<Box<dyn TestInstance + 'f>>,
    pool: ContextPool<'f, F>,
    elapsed: Duration,
}

impl<F: TestFactory + ?Sized> JoinedRun<'_, F> {
    fn teardown(self) -> RunResult {
        let JoinedRun {
            test_name,
            requested,
            results,
            instances,
            mut pool,
            elapsed,
        } = self;

        let released = instances.len();
        drop(instances);
        pool.destroy_all();
        debug!(test = %test_name, released, "teardown complete");

        RunResult {
            test_name,
            requested,
            workers: results,
            elapsed,
        }
    }
}
