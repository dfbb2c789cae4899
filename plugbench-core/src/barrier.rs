//! Start Barrier
//!
//! Single-use rendezvous for `workers + 1` parties. Workers call
//! [`StartBarrier::wait`] once their per-thread setup is done; the coordinator
//! calls [`StartBarrier::release`], which records the run's start instant and
//! lets everyone go together once the last party has arrived.
//!
//! Unlike `std::sync::Barrier` it can be aborted, so a coordinator that fails
//! to spawn every worker can still unblock the ones already waiting, and a
//! worker that dies before arriving can leave without stalling the rest.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

#[derive(Debug, Default)]
struct State {
    arrived: usize,
    released: bool,
    aborted: bool,
    start: Option<Instant>,
}

/// Rendezvous barrier that aligns the start of all workers
#[derive(Debug)]
pub struct StartBarrier {
    parties: usize,
    state: Mutex<State>,
    cvar: Condvar,
}

impl StartBarrier {
    /// Barrier for `parties` participants, coordinator included
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(State::default()),
            cvar: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Worker side: block until released, returning the run's start instant.
    ///
    /// Returns `None` if the barrier was aborted.
    pub fn wait(&self) -> Option<Instant> {
        self.arrive(None)
    }

    /// Coordinator side: record the start instant, arrive, and block until
    /// every worker has arrived.
    ///
    /// Returns `None` if the barrier was aborted.
    pub fn release(&self) -> Option<Instant> {
        self.arrive(Some(Instant::now()))
    }

    /// Unblock every current and future waiter without releasing the run
    pub fn abort(&self) {
        let mut state = self.lock();
        if !state.released {
            state.aborted = true;
        }
        drop(state);
        self.cvar.notify_all();
    }

    /// Count a party that will never call [`wait`](Self::wait), such as a
    /// worker unwinding before it arrived. No effect once released or aborted.
    pub fn leave(&self) {
        let mut state = self.lock();
        if state.released || state.aborted {
            return;
        }
        state.arrived += 1;
        if state.arrived >= self.parties {
            state.released = true;
            drop(state);
            self.cvar.notify_all();
        }
    }

    fn arrive(&self, start: Option<Instant>) -> Option<Instant> {
        let mut state = self.lock();
        if state.aborted {
            return None;
        }
        if start.is_some() {
            state.start = start;
        }

        state.arrived += 1;
        if state.arrived >= self.parties {
            state.released = true;
            self.cvar.notify_all();
        } else {
            while !state.released && !state.aborted {
                state = self
                    .cvar
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }

        if state.released { state.start } else { None }
    }
}
