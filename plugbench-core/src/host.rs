//! Plugin Host
//!
//! Loads one native test module, checks its ABI version, and brokers creation
//! of test instances and shared contexts.
//!
//! ## Module Resolution
//!
//! ```text
//! PluginPaths { plugins_dir }
//!       │
//!       ▼
//!  module "plugin_empty"
//!       │  absolute? use as-is : plugins_dir/module
//!       │  missing?  try plugins_dir/libplugin_empty.so (platform name)
//!       ▼
//!  dlopen → bt_version == BENCH_ABI_VERSION → PluginHost
//! ```

use crate::context::ContextHandle;
use crate::error::LoadError;
use libloading::Library;
use plugbench_abi::{
    BENCH_ABI_VERSION, CapabilityFn, ContextTable, CreateContextFn, CreateTestFn,
    DestroyContextFn, PluginTable, SYM_CREATE_CONTEXT, SYM_CREATE_TEST, SYM_DESTROY_CONTEXT,
    SYM_VERSION, TestObject, TestVTable, VersionFn,
};
use std::ffi::CString;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::{debug, warn};

/// One live test instance, driven by exactly one worker thread.
///
/// Dropping the instance releases it.
pub trait TestInstance: Send {
    /// Preparation before a sample; `false` stops the worker
    fn run_before(&mut self) -> bool;
    /// The measured unit; `false` stops the worker
    fn run(&mut self) -> bool;
    /// Cleanup after a recorded sample; `false` stops the worker
    fn run_after(&mut self) -> bool;
}

/// Source of test instances and shared contexts for one test run
pub trait TestFactory {
    /// Create an instance for `initializer` bound to `context`.
    ///
    /// `None` means the plugin refused; the caller drops that worker.
    fn create_test(
        &self,
        initializer: &str,
        context: ContextHandle,
    ) -> Option<Box<dyn TestInstance + '_>>;

    /// Create a shared context, or return the null handle
    fn create_context(&self, initializer: &str) -> ContextHandle;

    /// Destroy a context previously returned by [`create_context`](Self::create_context)
    fn destroy_context(&self, handle: ContextHandle);
}

/// Where plugin modules are looked up. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPaths {
    plugins_dir: PathBuf,
}

impl PluginPaths {
    /// Search `plugins_dir` for relative module paths
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
        }
    }

    /// Directory relative module paths are joined to
    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Resolve a configured module path to an existing file
    pub fn resolve(&self, module: &str) -> Result<PathBuf, LoadError> {
        let module = Path::new(module);
        let candidate = if module.is_absolute() {
            module.to_path_buf()
        } else {
            self.plugins_dir.join(module)
        };
        if candidate.is_file() {
            return Ok(candidate);
        }

        // Bare crate names resolve to the platform library file name
        if let Some(name) = candidate.file_name() {
            let platform = candidate.with_file_name(libloading::library_filename(name));
            if platform.is_file() {
                return Ok(platform);
            }
        }

        Err(LoadError::NotFound(candidate))
    }
}

/// Join the default and call-site initializers with a comma, skipping the
/// separator when either side is empty.
pub fn compose_initializer(default: &str, call_site: &str) -> String {
    match (default.is_empty(), call_site.is_empty()) {
        (true, _) => call_site.to_owned(),
        (false, true) => default.to_owned(),
        (false, false) => format!("{default},{call_site}"),
    }
}

/// A loaded plugin module
#[derive(Debug)]
pub struct PluginHost {
    table: PluginTable,
    default_initializer: String,
    path: Option<PathBuf>,
    // Declared last: the module stays mapped until everything above is gone,
    // and instances borrow the host so they are released before this drops.
    _library: Option<Library>,
}

impl PluginHost {
    /// Load `module` from `paths` and verify its ABI version.
    pub fn load(
        paths: &PluginPaths,
        module: &str,
        default_initializer: &str,
    ) -> Result<Self, LoadError> {
        let path = paths.resolve(module)?;

        // SAFETY: loading runs the module's static initialisers. Plugins are
        // trusted code supplied by the operator.
        let library = unsafe { Library::new(&path) }.map_err(|source| LoadError::Open {
            path: path.clone(),
            source,
        })?;

        let version: VersionFn = required_symbol(&library, &path, SYM_VERSION)?;
        let create_test: CreateTestFn = required_symbol(&library, &path, SYM_CREATE_TEST)?;
        let create_context = optional_symbol::<CreateContextFn>(&library, SYM_CREATE_CONTEXT);
        let destroy_context = optional_symbol::<DestroyContextFn>(&library, SYM_DESTROY_CONTEXT);

        let contexts = match (create_context, destroy_context) {
            (Some(create), Some(destroy)) => Some(ContextTable { create, destroy }),
            (None, None) => None,
            _ => {
                warn!(
                    path = %path.display(),
                    "plugin exports only half of the context interface; contexts disabled"
                );
                None
            }
        };

        let table = PluginTable {
            version,
            create_test,
            contexts,
        };

        // SAFETY: the table was resolved from `library`, which the host keeps
        // alive for as long as the table is reachable.
        let mut host = unsafe { Self::from_table(table, default_initializer)? };
        debug!(path = %path.display(), contexts = host.has_contexts(), "plugin loaded");
        host.path = Some(path);
        host._library = Some(library);
        Ok(host)
    }

    /// Build a host around an already-resolved function table, e.g. a plugin
    /// linked into the current process.
    ///
    /// # Safety
    /// Every function in `table` must follow the plugin ABI and stay callable
    /// for the lifetime of the returned host.
    pub unsafe fn from_table(
        table: PluginTable,
        default_initializer: &str,
    ) -> Result<Self, LoadError> {
        let found = unsafe { (table.version)() };
        if found != BENCH_ABI_VERSION {
            return Err(LoadError::VersionMismatch {
                expected: BENCH_ABI_VERSION,
                found,
            });
        }

        Ok(Self {
            table,
            default_initializer: default_initializer.to_owned(),
            path: None,
            _library: None,
        })
    }

    /// Initializer prepended to every instance initializer
    pub fn default_initializer(&self) -> &str {
        &self.default_initializer
    }

    /// Path of the loaded module, if loaded from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the plugin exports the context interface
    pub fn has_contexts(&self) -> bool {
        self.table.contexts.is_some()
    }
}

impl TestFactory for PluginHost {
    fn create_test(
        &self,
        initializer: &str,
        context: ContextHandle,
    ) -> Option<Box<dyn TestInstance + '_>> {
        let combined = compose_initializer(&self.default_initializer, initializer);
        let combined = c_initializer(&combined)?;
        let ptr = combined.as_ref().map_or(std::ptr::null(), |c| c.as_ptr());

        // SAFETY: `ptr` is null or a live NUL-terminated string for the call.
        let object = unsafe { (self.table.create_test)(ptr, context.get()) };
        let object = NonNull::new(object)?;

        Some(Box::new(PluginInstance {
            object,
            _host: PhantomData,
        }))
    }

    fn create_context(&self, initializer: &str) -> ContextHandle {
        let Some(contexts) = self.table.contexts else {
            return ContextHandle::NONE;
        };
        let Some(initializer) = c_initializer(initializer) else {
            return ContextHandle::NONE;
        };
        let ptr = initializer.as_ref().map_or(std::ptr::null(), |c| c.as_ptr());

        // SAFETY: `ptr` is null or a live NUL-terminated string for the call.
        ContextHandle::new(unsafe { (contexts.create)(ptr) })
    }

    fn destroy_context(&self, handle: ContextHandle) {
        if handle.is_none() {
            return;
        }
        if let Some(contexts) = self.table.contexts {
            // SAFETY: handles only come from `create_context` and the pool
            // destroys each one once.
            unsafe { (contexts.destroy)(handle.get()) };
        }
    }
}

/// `None` when the string cannot cross the C boundary; `Some(None)` for the
/// empty string, which is passed as a null pointer.
fn c_initializer(initializer: &str) -> Option<Option<CString>> {
    if initializer.is_empty() {
        return Some(None);
    }
    match CString::new(initializer) {
        Ok(c) => Some(Some(c)),
        Err(_) => {
            warn!(initializer, "initializer contains a NUL byte; refusing to pass it to the plugin");
            None
        }
    }
}

fn symbol_name(symbol: &'static [u8]) -> &'static str {
    let trimmed = symbol.strip_suffix(b"\0").unwrap_or(symbol);
    std::str::from_utf8(trimmed).unwrap_or("<non-utf8>")
}

fn required_symbol<T: Copy>(
    library: &Library,
    path: &Path,
    symbol: &'static [u8],
) -> Result<T, LoadError> {
    // SAFETY: `T` is the function pointer type the ABI defines for `symbol`.
    unsafe { library.get::<T>(symbol) }
        .map(|s| *s)
        .map_err(|source| LoadError::MissingSymbol {
            path: path.to_path_buf(),
            symbol: symbol_name(symbol),
            source,
        })
}

fn optional_symbol<T: Copy>(library: &Library, symbol: &'static [u8]) -> Option<T> {
    // SAFETY: as in `required_symbol`.
    unsafe { library.get::<T>(symbol) }.ok().map(|s| *s)
}

/// A test instance created by a [`PluginHost`]
struct PluginInstance<'h> {
    object: NonNull<TestObject>,
    _host: PhantomData<&'h PluginHost>,
}

// SAFETY: an instance is driven by one thread at a time; the ABI requires
// plugins to accept calls from a thread other than the creating one.
unsafe impl Send for PluginInstance<'_> {}

impl PluginInstance<'_> {
    #[inline(always)]
    fn vtable(&self) -> &TestVTable {
        // SAFETY: the plugin keeps the vtable valid while the instance lives.
        unsafe { &*self.object.as_ref().vtable }
    }

    #[inline(always)]
    fn call(&mut self, f: CapabilityFn) -> bool {
        // SAFETY: `object` is live until `release` in `drop`.
        unsafe { f(self.object.as_ptr()) != 0 }
    }
}

impl TestInstance for PluginInstance<'_> {
    #[inline]
    fn run_before(&mut self) -> bool {
        let f = self.vtable().run_before;
        self.call(f)
    }

    #[inline]
    fn run(&mut self) -> bool {
        let f = self.vtable().run;
        self.call(f)
    }

    #[inline]
    fn run_after(&mut self) -> bool {
        let f = self.vtable().run_after;
        self.call(f)
    }
}

impl Drop for PluginInstance<'_> {
    fn drop(&mut self) {
        let release = self.vtable().release;
        // SAFETY: called exactly once; the pointer is not used afterwards.
        unsafe { release(self.object.as_ptr()) };
    }
}
