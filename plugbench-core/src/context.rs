//! Shared Context Pool
//!
//! Contexts are plugin-owned resources shared by every worker whose context
//! initializer string is identical. The pool is populated during the
//! single-threaded setup phase and emptied during teardown, so it needs no
//! locking.

use crate::host::TestFactory;
use fxhash::FxHashMap;
use tracing::debug;

/// Opaque plugin context handle. Zero means "no context".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextHandle(u64);

impl ContextHandle {
    /// The null handle
    pub const NONE: Self = Self(0);

    /// Wrap a raw handle returned by a plugin
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value passed across the plugin boundary
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the null handle
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Per-run cache of context handles keyed by initializer string
pub struct ContextPool<'f, F: TestFactory + ?Sized> {
    factory: &'f F,
    handles: FxHashMap<String, ContextHandle>,
}

impl<'f, F: TestFactory + ?Sized> ContextPool<'f, F> {
    /// Create an empty pool bound to `factory`
    pub fn new(factory: &'f F) -> Self {
        Self {
            factory,
            handles: FxHashMap::default(),
        }
    }

    /// Return the context for `initializer`, creating it on first use.
    ///
    /// An empty initializer never reaches the plugin and resolves to
    /// [`ContextHandle::NONE`]. A null handle from the plugin is returned but
    /// not cached, so the next request asks the plugin again.
    pub fn resolve(&mut self, initializer: &str) -> ContextHandle {
        if initializer.is_empty() {
            return ContextHandle::NONE;
        }
        if let Some(&handle) = self.handles.get(initializer) {
            return handle;
        }

        let handle = self.factory.create_context(initializer);
        if !handle.is_none() {
            debug!(initializer, handle = handle.get(), "context created");
            self.handles.insert(initializer.to_owned(), handle);
        }
        handle
    }

    /// Number of live contexts
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no context is live
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Destroy every cached context exactly once.
    ///
    /// Every instance bound to these contexts must already be released.
    pub fn destroy_all(&mut self) {
        for (initializer, handle) in self.handles.drain() {
            debug!(initializer = %initializer, handle = handle.get(), "context destroyed");
            self.factory.destroy_context(handle);
        }
    }
}

impl<F: TestFactory + ?Sized> Drop for ContextPool<'_, F> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
