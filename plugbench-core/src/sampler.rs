//! Sampler - the per-worker measurement loop
//!
//! ```text
//! while count < budget:
//!     run_before()          ── false → stop, nothing recorded
//!     T0
//!     run()                 ── false → stop, T0 discarded
//!     T1; record {T0, T1-T0}; count += 1
//!     run_after()           ── false → stop, sample kept
//! ```
//!
//! Only `run` is inside the measured region.

use crate::host::TestInstance;
use crate::measure::nanos_between;
use crate::slot::{Sample, TimingSeries};
use std::fmt;
use std::time::Instant;

/// Capability whose stop signal ended a worker's loop early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPhase {
    /// `run_before` returned false
    RunBefore,
    /// `run` returned false
    Run,
    /// `run_after` returned false
    RunAfter,
}

impl fmt::Display for StopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopPhase::RunBefore => "RunBefore",
            StopPhase::Run => "Run",
            StopPhase::RunAfter => "RunAfter",
        })
    }
}

/// Run the measurement loop.
///
/// `series` must come from [`TimingSeries::allocate`]; its length is the
/// sample budget. On return it holds exactly the recorded samples, with
/// timestamps relative to `epoch`.
pub fn run_sampler(
    instance: &mut (dyn TestInstance + '_),
    series: &mut TimingSeries,
    epoch: Instant,
) -> Option<StopPhase> {
    let buffer = series.as_mut_slice();
    let budget = buffer.len();
    let mut count = 0;
    let mut stopped_by = None;

    while count < budget {
        if !instance.run_before() {
            stopped_by = Some(StopPhase::RunBefore);
            break;
        }

        let t0 = Instant::now();
        if !instance.run() {
            stopped_by = Some(StopPhase::Run);
            break;
        }
        let t1 = Instant::now();

        buffer[count] = Sample {
            timestamp_ns: nanos_between(epoch, t0),
            duration_ns: nanos_between(t0, t1),
        };
        count += 1;

        if !instance.run_after() {
            stopped_by = Some(StopPhase::RunAfter);
            break;
        }
    }

    series.truncate(count);
    stopped_by
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, MockInstance};
    use std::time::Duration;

    fn sample(behavior: Behavior, budget: usize) -> (TimingSeries, Option<StopPhase>) {
        let mut instance = MockInstance::new(behavior);
        let mut series = TimingSeries::allocate(budget).unwrap();
        let stopped = run_sampler(&mut instance, &mut series, Instant::now());
        (series, stopped)
    }

    #[test]
    fn test_full_budget_without_stop() {
        let (series, stopped) = sample(Behavior::default(), 25);
        assert_eq!(series.len(), 25);
        assert_eq!(stopped, None);
    }

    #[test]
    fn test_zero_budget_records_nothing() {
        let (series, stopped) = sample(Behavior::default(), 0);
        assert!(series.is_empty());
        assert_eq!(stopped, None);
    }

    #[test]
    fn test_stop_in_run_before_excludes_iteration() {
        let behavior = Behavior {
            stop_before_at: Some(4),
            ..Behavior::default()
        };
        let (series, stopped) = sample(behavior, 10);
        assert_eq!(series.len(), 4);
        assert_eq!(stopped, Some(StopPhase::RunBefore));
    }

    #[test]
    fn test_stop_in_run_discards_sample() {
        let behavior = Behavior {
            stop_run_at: Some(3),
            ..Behavior::default()
        };
        let (series, stopped) = sample(behavior, 10);
        assert_eq!(series.len(), 3);
        assert_eq!(stopped, Some(StopPhase::Run));
    }

    #[test]
    fn test_stop_in_run_after_keeps_sample() {
        let behavior = Behavior {
            stop_after_at: Some(3),
            ..Behavior::default()
        };
        let (series, stopped) = sample(behavior, 10);
        assert_eq!(series.len(), 4);
        assert_eq!(stopped, Some(StopPhase::RunAfter));
    }

    #[test]
    fn test_stop_at_first_iteration() {
        let behavior = Behavior {
            stop_run_at: Some(0),
            ..Behavior::default()
        };
        let (series, _) = sample(behavior, 10);
        assert!(series.is_empty());
    }

    #[test]
    fn test_duration_excludes_before_and_after() {
        let behavior = Behavior {
            before_sleep: Duration::from_millis(5),
            after_sleep: Duration::from_millis(5),
            ..Behavior::default()
        };
        let (series, _) = sample(behavior, 3);
        for s in series.samples() {
            assert!(
                s.duration_ns < 5_000_000,
                "measured {}ns includes hook time",
                s.duration_ns
            );
        }
    }

    #[test]
    fn test_timestamps_are_monotonic() {
        let (series, _) = sample(Behavior::default(), 50);
        let ts: Vec<_> = series.samples().iter().map(|s| s.timestamp_ns).collect();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
    }
}
