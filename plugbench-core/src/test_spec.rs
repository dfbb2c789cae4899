//! Test definitions and per-thread assignment

use std::collections::BTreeMap;
use std::fmt;

/// Per-thread override of the initializer and context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadOverride {
    /// Call-site initializer for this thread
    pub initializer: String,
    /// Name of an entry in [`TestSpec::contexts`]; empty for the default
    pub context: String,
}

/// One test definition, immutable once loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSpec {
    /// Display name
    pub name: String,
    /// Plugin module path, relative to the plugin directory or absolute
    pub module: String,
    /// Number of worker threads requested
    pub concurrency: usize,
    /// Sample budget per worker
    pub samples: usize,
    /// Initializer prepended to every instance initializer
    pub initializer: String,
    /// Context initializer used by threads without a named context
    pub context: String,
    /// Per-thread overrides, assigned round-robin
    pub threads: Vec<ThreadOverride>,
    /// Named contexts: name → context initializer
    pub contexts: BTreeMap<String, String>,
}

/// Initializer and context resolved for one worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadAssignment {
    /// Call-site initializer (the default is composed in by the host)
    pub initializer: String,
    /// Context initializer; empty for no context
    pub context: String,
}

impl TestSpec {
    /// Resolve the initializer and context for worker `index`.
    ///
    /// With overrides present, worker `i` takes override `i % overrides.len()`.
    /// A context name that is empty or unknown keeps the default context.
    pub fn assignment(&self, index: usize) -> ThreadAssignment {
        let mut assignment = ThreadAssignment {
            initializer: String::new(),
            context: self.context.clone(),
        };

        if self.threads.is_empty() {
            return assignment;
        }

        let thread = &self.threads[index % self.threads.len()];
        assignment.initializer = thread.initializer.clone();
        if !thread.context.is_empty() {
            if let Some(init) = self.contexts.get(&thread.context) {
                assignment.context = init.clone();
            }
        }
        assignment
    }
}

impl fmt::Display for ThreadAssignment {
    /// `(context) initializer`, with `-` for an empty initializer
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "({}) ", self.context)?;
        }
        if self.initializer.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&self.initializer)
        }
    }
}
