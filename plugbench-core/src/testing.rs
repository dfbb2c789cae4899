//! In-process test doubles for the factory seam

use crate::context::ContextHandle;
use crate::host::{TestFactory, TestInstance};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Scripted stop points, counted per capability from zero
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Behavior {
    pub stop_before_at: Option<usize>,
    pub stop_run_at: Option<usize>,
    pub stop_after_at: Option<usize>,
    pub before_sleep: Duration,
    pub after_sleep: Duration,
}

impl Behavior {
    /// Parse `before=N,run=N,after=N` from an initializer; unknown keys are ignored
    pub fn parse(initializer: &str) -> Self {
        let mut behavior = Self::default();
        for (key, value) in initializer.split(',').filter_map(|kv| kv.split_once('=')) {
            let Ok(n) = value.parse::<usize>() else {
                continue;
            };
            match key {
                "before" => behavior.stop_before_at = Some(n),
                "run" => behavior.stop_run_at = Some(n),
                "after" => behavior.stop_after_at = Some(n),
                _ => {}
            }
        }
        behavior
    }
}

type EventLog = Arc<Mutex<Vec<String>>>;

fn push(log: &EventLog, event: String) {
    log.lock().unwrap().push(event);
}

pub struct MockInstance {
    behavior: Behavior,
    befores: usize,
    runs: usize,
    afters: usize,
    release: Option<(String, EventLog)>,
}

impl MockInstance {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            befores: 0,
            runs: 0,
            afters: 0,
            release: None,
        }
    }
}

fn step(counter: &mut usize, stop_at: Option<usize>) -> bool {
    let current = *counter;
    *counter += 1;
    stop_at != Some(current)
}

impl TestInstance for MockInstance {
    fn run_before(&mut self) -> bool {
        if let Some((label, log)) = &self.release {
            if self.befores == 0 {
                let name = thread::current().name().unwrap_or("").to_owned();
                push(log, format!("started {label} on {name}"));
            }
        }
        thread::sleep(self.behavior.before_sleep);
        step(&mut self.befores, self.behavior.stop_before_at)
    }

    fn run(&mut self) -> bool {
        step(&mut self.runs, self.behavior.stop_run_at)
    }

    fn run_after(&mut self) -> bool {
        thread::sleep(self.behavior.after_sleep);
        step(&mut self.afters, self.behavior.stop_after_at)
    }
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        if let Some((label, log)) = &self.release {
            push(log, format!("release {label}"));
        }
    }
}

/// Factory recording every plugin-boundary call in order.
///
/// Initializers containing `fail` are refused; the rest are parsed by
/// [`Behavior::parse`].
pub struct MockFactory {
    next_context: AtomicU64,
    decline_contexts: bool,
    events: EventLog,
    destroyed: Mutex<Vec<ContextHandle>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            next_context: AtomicU64::new(1),
            decline_contexts: false,
            events: EventLog::default(),
            destroyed: Mutex::new(Vec::new()),
        }
    }

    pub fn declining_contexts(mut self) -> Self {
        self.decline_contexts = true;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn destroyed_contexts(&self) -> Vec<ContextHandle> {
        self.destroyed.lock().unwrap().clone()
    }
}

impl TestFactory for MockFactory {
    fn create_test(
        &self,
        initializer: &str,
        context: ContextHandle,
    ) -> Option<Box<dyn TestInstance + '_>> {
        push(
            &self.events,
            format!("create_test {initializer} ctx={}", context.get()),
        );
        if initializer.contains("fail") {
            return None;
        }
        let mut instance = MockInstance::new(Behavior::parse(initializer));
        instance.release = Some((initializer.to_owned(), Arc::clone(&self.events)));
        Some(Box::new(instance))
    }

    fn create_context(&self, initializer: &str) -> ContextHandle {
        push(&self.events, format!("create_context {initializer}"));
        if self.decline_contexts {
            return ContextHandle::NONE;
        }
        ContextHandle::new(self.next_context.fetch_add(1, Ordering::Relaxed))
    }

    fn destroy_context(&self, handle: ContextHandle) {
        push(&self.events, format!("destroy_context {}", handle.get()));
        self.destroyed.lock().unwrap().push(handle);
    }
}

mod tests {
    use super::*;

    #[test]
    fn test_behavior_parse() {
        let b = Behavior::parse("id=x,before=3,run=2,after=oops");
        assert_eq!(b.stop_before_at, Some(3));
        assert_eq!(b.stop_run_at, Some(2));
        assert_eq!(b.stop_after_at, None);
    }
}
