//! Worker slots and timing series

use crate::context::ContextHandle;
use crate::host::TestInstance;
use crate::test_spec::ThreadAssignment;
use std::collections::TryReserveError;

/// One measured call of `Run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    /// Start of the call, nanoseconds since the run was released
    pub timestamp_ns: u64,
    /// Duration of the call in nanoseconds
    pub duration_ns: u64,
}

/// Samples of one worker in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingSeries {
    samples: Vec<Sample>,
}

impl TimingSeries {
    /// Buffer of `budget` zeroed entries, sized up front so the measured loop
    /// never reallocates. Truncate to the recorded count afterwards.
    ///
    /// Fails instead of aborting when the budget cannot be allocated.
    pub fn allocate(budget: usize) -> Result<Self, TryReserveError> {
        let mut samples = Vec::new();
        samples.try_reserve_exact(budget)?;
        samples.resize(budget, Sample::default());
        Ok(Self { samples })
    }

    /// Series from already-recorded samples
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.samples.truncate(len);
    }

    /// Recorded samples
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Durations in nanoseconds
    pub fn durations(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.duration_ns).collect()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Everything one worker thread owns during a run
pub struct WorkerSlot<'f> {
    /// Zero-based thread index within the test definition
    pub index: usize,
    /// Resolved initializer and context initializer
    pub assignment: ThreadAssignment,
    /// Context handle the instance was bound to
    pub context: ContextHandle,
    /// Maximum number of samples
    pub sample_budget: usize,
    pub(crate) instance: Box<dyn TestInstance + 'f>,
}

impl<'f> WorkerSlot<'f> {
    /// Bundle a created instance with its configuration
    pub fn new(
        index: usize,
        assignment: ThreadAssignment,
        context: ContextHandle,
        sample_budget: usize,
        instance: Box<dyn TestInstance + 'f>,
    ) -> Self {
        Self {
            index,
            assignment,
            context,
            sample_budget,
            instance,
        }
    }
}

impl std::fmt::Debug for WorkerSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSlot")
            .field("index", &self.index)
            .field("assignment", &self.assignment)
            .field("context", &self.context)
            .field("sample_budget", &self.sample_budget)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_fills_budget() {
        let series = TimingSeries::allocate(8).unwrap();
        assert_eq!(series.len(), 8);
        assert!(series.samples().iter().all(|s| *s == Sample::default()));
    }

    #[test]
    fn test_oversized_budget_is_an_error() {
        assert!(TimingSeries::allocate(usize::MAX / 8).is_err());
    }
}
