//! Suite configuration loading from config.yaml
//!
//! ```yaml
//! concurrency: 4          # suite default, falls back to available cores
//! samples: 100000         # suite default, falls back to 1_000_000
//! tests:
//!   - name: spin
//!     load: plugin_spin
//!     init: "iters=100"
//!     context: "counter=main"
//!     threads:
//!       - "id=1"
//!       - { init: "id=2", context: shared }
//!     contexts:
//!       shared: "counter=shared"
//! ```

use plugbench_core::{TestSpec, ThreadOverride};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Samples per worker when neither the suite nor the test sets a budget
pub const DEFAULT_SAMPLES: usize = 1_000_000;

/// Fatal configuration problem; nothing runs
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        /// Path that was tried
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for a suite
    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A test entry lacks a required key
    #[error("test #{index} is missing required field `{field}`")]
    MissingField {
        /// Zero-based position in `tests`
        index: usize,
        /// Name of the missing key
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct SuiteFile {
    concurrency: Option<i64>,
    samples: Option<i64>,
    #[serde(default)]
    tests: Vec<TestEntry>,
}

#[derive(Debug, Deserialize)]
struct TestEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    load: String,
    #[serde(default)]
    init: String,
    #[serde(default)]
    context: String,
    concurrency: Option<i64>,
    samples: Option<i64>,
    #[serde(default)]
    threads: Vec<ThreadEntry>,
    #[serde(default)]
    contexts: BTreeMap<String, String>,
}

/// Either a bare initializer or `{init, context}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ThreadEntry {
    Init(String),
    Full {
        #[serde(default)]
        init: String,
        #[serde(default)]
        context: String,
    },
}

impl From<ThreadEntry> for ThreadOverride {
    fn from(entry: ThreadEntry) -> Self {
        match entry {
            ThreadEntry::Init(initializer) => ThreadOverride {
                initializer,
                context: String::new(),
            },
            ThreadEntry::Full { init, context } => ThreadOverride {
                initializer: init,
                context,
            },
        }
    }
}

/// Parsed suite, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    /// Test definitions with defaults applied
    pub tests: Vec<TestSpec>,
}

fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Values below one become one, with a warning naming the key
fn clamp_positive(value: i64, key: &str, test: &str) -> usize {
    if value < 1 {
        warn!(test, key, value, "clamping to 1");
        1
    } else {
        usize::try_from(value).unwrap_or(usize::MAX)
    }
}

impl TestSuite {
    /// Load and validate a suite file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a suite from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let file: SuiteFile = serde_yaml::from_str(content)?;

        let concurrency = file.concurrency.unwrap_or(available_cores() as i64);
        let samples = file.samples.unwrap_or(DEFAULT_SAMPLES as i64);

        let tests = file
            .tests
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                if entry.name.is_empty() {
                    return Err(ConfigError::MissingField {
                        index,
                        field: "name",
                    });
                }
                if entry.load.is_empty() {
                    return Err(ConfigError::MissingField {
                        index,
                        field: "load",
                    });
                }

                Ok(TestSpec {
                    concurrency: clamp_positive(
                        entry.concurrency.unwrap_or(concurrency),
                        "concurrency",
                        &entry.name,
                    ),
                    samples: clamp_positive(
                        entry.samples.unwrap_or(samples),
                        "samples",
                        &entry.name,
                    ),
                    module: entry.load,
                    initializer: entry.init,
                    context: entry.context,
                    threads: entry.threads.into_iter().map(Into::into).collect(),
                    contexts: entry.contexts,
                    name: entry.name,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { tests })
    }

    /// Apply suite-wide command-line overrides to every test
    pub fn apply_overrides(&mut self, samples: Option<usize>, concurrency: Option<usize>) {
        for test in &mut self.tests {
            if let Some(samples) = samples {
                test.samples = samples.max(1);
            }
            if let Some(concurrency) = concurrency {
                test.concurrency = concurrency.max(1);
            }
        }
    }
}
