//! Baseline plugin: `run` does nothing, so the report shows the host's own
//! per-call overhead.

use plugbench_abi::{BenchPlugin, BenchTest, export_plugin};
use std::sync::Arc;

/// Test whose measured call is empty
pub struct Empty;

impl BenchTest for Empty {
    fn run(&mut self) -> bool {
        true
    }
}

/// Plugin entry point
pub struct EmptyPlugin;

impl BenchPlugin for EmptyPlugin {
    type Test = Empty;
    type Context = ();

    fn create_test(_initializer: &str, _context: Option<Arc<()>>) -> Option<Empty> {
        Some(Empty)
    }
}

export_plugin!(EmptyPlugin);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_stops() {
        let mut test = EmptyPlugin::create_test("", None).unwrap();
        assert!((0..1000).all(|_| test.run_before() && test.run() && test.run_after()));
    }

    #[test]
    fn test_no_contexts() {
        assert!(EmptyPlugin::create_context("anything").is_none());
    }
}
