//! Error types for plugin loading and test runs

#![allow(missing_docs)]

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a plugin module. Fatal to one test definition only.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No file at the resolved path
    #[error("plugin module not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The dynamic loader rejected the file
    #[error("failed to open plugin module {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// A required export is absent
    #[error("plugin module {} is missing required symbol `{symbol}`", .path.display())]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// `bt_version` returned an unexpected value
    #[error("plugin ABI version mismatch: host expects {expected}, plugin reports {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Failure of a single test run after the plugin was loaded
#[derive(Debug, Error)]
pub enum RunError {
    /// The plugin refused every instance
    #[error("no test instance could be created ({requested} requested)")]
    NoInstances { requested: usize },

    /// The OS could not start a worker thread
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}
