//! Spin plugin
//!
//! Initializer keys, comma separated:
//! - `iters=N`: loop iterations per measured call (default 100)
//! - `limit=N`: stop after N calls
//!
//! A context counts calls across every instance sharing it, which makes
//! contention on one cache line visible in the report.

use plugbench_abi::{BenchPlugin, BenchTest, export_plugin};
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_ITERS: u64 = 100;

/// Calls shared between instances
#[derive(Debug, Default)]
pub struct SharedCounter {
    calls: AtomicU64,
}

impl SharedCounter {
    /// Calls recorded so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

/// Spins `iters` times per call
pub struct Spin {
    iters: u64,
    limit: Option<u64>,
    calls: u64,
    shared: Option<Arc<SharedCounter>>,
}

impl BenchTest for Spin {
    fn run_before(&mut self) -> bool {
        self.limit.is_none_or(|limit| self.calls < limit)
    }

    fn run(&mut self) -> bool {
        let mut acc = 0u64;
        for i in 0..self.iters {
            acc = acc.wrapping_add(black_box(i));
        }
        black_box(acc);

        if let Some(shared) = &self.shared {
            shared.calls.fetch_add(1, Ordering::Relaxed);
        }
        self.calls += 1;
        true
    }
}

/// Plugin entry point
pub struct SpinPlugin;

fn parse_u64(initializer: &str, key: &str) -> Option<u64> {
    initializer
        .split(',')
        .filter_map(|kv| kv.split_once('='))
        .filter(|(k, _)| k.trim() == key)
        .filter_map(|(_, v)| v.trim().parse().ok())
        .last()
}

impl BenchPlugin for SpinPlugin {
    type Test = Spin;
    type Context = SharedCounter;

    fn create_test(initializer: &str, context: Option<Arc<SharedCounter>>) -> Option<Spin> {
        Some(Spin {
            iters: parse_u64(initializer, "iters").unwrap_or(DEFAULT_ITERS),
            limit: parse_u64(initializer, "limit"),
            calls: 0,
            shared: context,
        })
    }

    fn create_context(_initializer: &str) -> Option<SharedCounter> {
        Some(SharedCounter::default())
    }
}

export_plugin!(SpinPlugin);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_last_value_wins() {
        assert_eq!(parse_u64("iters=5", "iters"), Some(5));
        assert_eq!(parse_u64("iters=5, iters=9", "iters"), Some(9));
        assert_eq!(parse_u64("mode=fast", "iters"), None);
        assert_eq!(parse_u64("iters=abc", "iters"), None);
    }

    #[test]
    fn test_limit_stops_before_next_call() {
        let mut spin = SpinPlugin::create_test("iters=1,limit=2", None).unwrap();
        assert!(spin.run_before() && spin.run());
        assert!(spin.run_before() && spin.run());
        assert!(!spin.run_before());
    }

    #[test]
    fn test_shared_counter() {
        let ctx = Arc::new(SpinPlugin::create_context("").unwrap());
        let mut a = SpinPlugin::create_test("", Some(Arc::clone(&ctx))).unwrap();
        let mut b = SpinPlugin::create_test("", Some(Arc::clone(&ctx))).unwrap();
        a.run();
        b.run();
        b.run();
        assert_eq!(ctx.calls(), 3);
    }
}
