//! Test Planner
//!
//! Selects test definitions by regex on their name, in config-file order.

use plugbench_core::TestSpec;
use regex::Regex;

/// Tests selected for execution
pub struct ExecutionPlan<'s> {
    /// Selected tests in config-file order
    pub tests: Vec<&'s TestSpec>,
}

/// Build execution plan from the loaded suite
pub fn build_plan<'s>(
    tests: impl IntoIterator<Item = &'s TestSpec>,
    filter: Option<&Regex>,
) -> ExecutionPlan<'s> {
    let tests = tests
        .into_iter()
        .filter(|t| filter.is_none_or(|re| re.is_match(&t.name)))
        .collect();

    ExecutionPlan { tests }
}
