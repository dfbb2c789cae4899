//! Plugin SDK
//!
//! Safe traits for writing plugins in Rust, plus the `extern "C"` glue that
//! adapts them to the raw [`PluginTable`](crate::PluginTable) layout.
//!
//! ```ignore
//! use plugbench_abi::{BenchPlugin, BenchTest, export_plugin};
//! use std::sync::Arc;
//!
//! struct Noop;
//!
//! impl BenchTest for Noop {
//!     fn run(&mut self) -> bool {
//!         true
//!     }
//! }
//!
//! struct NoopPlugin;
//!
//! impl BenchPlugin for NoopPlugin {
//!     type Test = Noop;
//!     type Context = ();
//!
//!     fn create_test(_initializer: &str, _context: Option<Arc<()>>) -> Option<Noop> {
//!         Some(Noop)
//!     }
//! }
//!
//! export_plugin!(NoopPlugin);
//! ```
//!
//! Contexts are reference counted: the handle given to the host is the raw
//! pointer of an `Arc<Context>`, and every test created against it receives
//! its own clone. Destroying the handle drops the host's reference only.

use crate::{BENCH_ABI_VERSION, ContextTable, PluginTable, TestObject, TestVTable};
use std::ffi::{CStr, c_char, c_int};
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// One test instance, driven by exactly one worker thread.
pub trait BenchTest: Send + 'static {
    /// Preparation before each sample. Return `false` to stop.
    fn run_before(&mut self) -> bool {
        true
    }

    /// The measured unit. Return `false` to stop; the sample is discarded.
    fn run(&mut self) -> bool;

    /// Cleanup after each recorded sample. Return `false` to stop.
    fn run_after(&mut self) -> bool {
        true
    }
}

/// Factory side of a plugin
pub trait BenchPlugin: 'static {
    /// Test instance type
    type Test: BenchTest;
    /// Shared context type; use `()` when contexts are not supported
    type Context: Send + Sync + 'static;

    /// Create a test instance from the combined initializer string.
    ///
    /// `context` is `None` when the host passed the null handle.
    fn create_test(initializer: &str, context: Option<Arc<Self::Context>>) -> Option<Self::Test>;

    /// Create a shared context. The default declines, which the host sees
    /// as the null handle.
    fn create_context(_initializer: &str) -> Option<Self::Context> {
        None
    }
}

#[repr(C)]
struct Instance<T> {
    header: TestObject,
    test: T,
}

struct VTableFor<T>(PhantomData<T>);

impl<T: BenchTest> VTableFor<T> {
    const VTABLE: TestVTable = TestVTable {
        run_before: run_before::<T>,
        run: run::<T>,
        run_after: run_after::<T>,
        release: release::<T>,
    };
}

/// Convert a nullable C string to `&str`; null reads as empty.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the
/// returned borrow.
unsafe fn initializer_str<'a>(ptr: *const c_char) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        return std::borrow::Cow::Borrowed("");
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
}

/// Run `f`, mapping a panic to the stop signal
fn guarded(f: impl FnOnce() -> bool) -> c_int {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(true) => 1,
        Ok(false) | Err(_) => 0,
    }
}

unsafe extern "C" fn run_before<T: BenchTest>(this: *mut TestObject) -> c_int {
    let instance = unsafe { &mut *this.cast::<Instance<T>>() };
    guarded(|| instance.test.run_before())
}

unsafe extern "C" fn run<T: BenchTest>(this: *mut TestObject) -> c_int {
    let instance = unsafe { &mut *this.cast::<Instance<T>>() };
    guarded(|| instance.test.run())
}

unsafe extern "C" fn run_after<T: BenchTest>(this: *mut TestObject) -> c_int {
    let instance = unsafe { &mut *this.cast::<Instance<T>>() };
    guarded(|| instance.test.run_after())
}

unsafe extern "C" fn release<T: BenchTest>(this: *mut TestObject) {
    if this.is_null() {
        return;
    }
    let instance = unsafe { Box::from_raw(this.cast::<Instance<T>>()) };
    let _ = catch_unwind(AssertUnwindSafe(move || drop(instance)));
}

/// `bt_version` implementation
pub extern "C" fn version() -> c_int {
    BENCH_ABI_VERSION
}

/// `bt_create_test` implementation for plugin `P`
///
/// # Safety
/// `initializer` must be null or a valid NUL-terminated string; `context`
/// must be zero or a handle returned by [`create_context::<P>`] that has not
/// been destroyed.
pub unsafe extern "C" fn create_test<P: BenchPlugin>(
    initializer: *const c_char,
    context: u64,
) -> *mut TestObject {
    let initializer = unsafe { initializer_str(initializer) };
    let context = if context == 0 {
        None
    } else {
        let ptr = context as usize as *const P::Context;
        // The host keeps its own reference until destroy; take another one.
        unsafe {
            Arc::increment_strong_count(ptr);
            Some(Arc::from_raw(ptr))
        }
    };

    let created = catch_unwind(AssertUnwindSafe(|| P::create_test(&initializer, context)));
    match created {
        Ok(Some(test)) => {
            let instance = Box::new(Instance {
                header: TestObject {
                    vtable: &VTableFor::<P::Test>::VTABLE,
                },
                test,
            });
            Box::into_raw(instance).cast::<TestObject>()
        }
        Ok(None) | Err(_) => std::ptr::null_mut(),
    }
}

/// `bt_create_context` implementation for plugin `P`
///
/// # Safety
/// `initializer` must be null or a valid NUL-terminated string.
pub unsafe extern "C" fn create_context<P: BenchPlugin>(initializer: *const c_char) -> u64 {
    let initializer = unsafe { initializer_str(initializer) };
    match catch_unwind(AssertUnwindSafe(|| P::create_context(&initializer))) {
        Ok(Some(context)) => Arc::into_raw(Arc::new(context)) as usize as u64,
        Ok(None) | Err(_) => 0,
    }
}

/// `bt_destroy_context` implementation for plugin `P`
///
/// # Safety
/// `context` must be zero or a live handle from [`create_context::<P>`];
/// each handle may be destroyed once.
pub unsafe extern "C" fn destroy_context<P: BenchPlugin>(context: u64) {
    if context == 0 {
        return;
    }
    let context = unsafe { Arc::from_raw(context as usize as *const P::Context) };
    let _ = catch_unwind(AssertUnwindSafe(move || drop(context)));
}

/// Function table for plugin `P`, for hosting a plugin linked into the
/// current process instead of loaded from a module.
pub fn table<P: BenchPlugin>() -> PluginTable {
    PluginTable {
        version,
        create_test: create_test::<P>,
        contexts: Some(ContextTable {
            create: create_context::<P>,
            destroy: destroy_context::<P>,
        }),
    }
}

/// Export the `bt_*` symbols for a [`BenchPlugin`] implementation.
///
/// Use once per `cdylib` crate.
#[macro_export]
macro_rules! export_plugin {
    ($plugin:ty) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn bt_version() -> ::std::ffi::c_int {
            $crate::sdk::version()
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn bt_create_test(
            initializer: *const ::std::ffi::c_char,
            context: u64,
        ) -> *mut $crate::TestObject {
            unsafe { $crate::sdk::create_test::<$plugin>(initializer, context) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn bt_create_context(initializer: *const ::std::ffi::c_char) -> u64 {
            unsafe { $crate::sdk::create_context::<$plugin>(initializer) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn bt_destroy_context(context: u64) {
            unsafe { $crate::sdk::destroy_context::<$plugin>(context) }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        calls: usize,
        limit: usize,
        shared: Option<Arc<AtomicUsize>>,
    }

    impl BenchTest for Counter {
        fn run(&mut self) -> bool {
            self.calls += 1;
            if let Some(shared) = &self.shared {
                shared.fetch_add(1, Ordering::Relaxed);
            }
            self.calls < self.limit
        }
    }

    struct CounterPlugin;

    impl BenchPlugin for CounterPlugin {
        type Test = Counter;
        type Context = AtomicUsize;

        fn create_test(initializer: &str, context: Option<Arc<AtomicUsize>>) -> Option<Counter> {
            if initializer == "fail" {
                return None;
            }
            if initializer == "panic" {
                panic!("refused");
            }
            Some(Counter {
                calls: 0,
                limit: initializer.parse().unwrap_or(usize::MAX),
                shared: context,
            })
        }

        fn create_context(initializer: &str) -> Option<AtomicUsize> {
            (!initializer.is_empty()).then(|| AtomicUsize::new(0))
        }
    }

    unsafe fn call(obj: *mut TestObject, f: impl Fn(&TestVTable) -> crate::CapabilityFn) -> c_int {
        unsafe { f(&*(*obj).vtable)(obj) }
    }

    #[test]
    fn test_version_matches_constant() {
        assert_eq!(version(), BENCH_ABI_VERSION);
        let table = table::<CounterPlugin>();
        assert_eq!(unsafe { (table.version)() }, BENCH_ABI_VERSION);
    }

    #[test]
    fn test_create_and_drive_instance() {
        let init = CString::new("2").unwrap();
        let obj = unsafe { create_test::<CounterPlugin>(init.as_ptr(), 0) };
        assert!(!obj.is_null());

        unsafe {
            assert_eq!(call(obj, |v| v.run_before), 1);
            assert_eq!(call(obj, |v| v.run), 1);
            assert_eq!(call(obj, |v| v.run_after), 1);
            // second run hits the limit
            assert_eq!(call(obj, |v| v.run), 0);
            ((*(*obj).vtable).release)(obj);
        }
    }

    #[test]
    fn test_null_initializer_reads_as_empty() {
        let obj = unsafe { create_test::<CounterPlugin>(std::ptr::null(), 0) };
        assert!(!obj.is_null());
        unsafe { ((*(*obj).vtable).release)(obj) };
    }

    #[test]
    fn test_declined_and_panicking_creation_yield_null() {
        let fail = CString::new("fail").unwrap();
        let panic = CString::new("panic").unwrap();
        unsafe {
            assert!(create_test::<CounterPlugin>(fail.as_ptr(), 0).is_null());
            assert!(create_test::<CounterPlugin>(panic.as_ptr(), 0).is_null());
        }
    }

    #[test]
    fn test_context_shared_between_instances() {
        let ctx_init = CString::new("shared").unwrap();
        let handle = unsafe { create_context::<CounterPlugin>(ctx_init.as_ptr()) };
        assert_ne!(handle, 0);

        let a = unsafe { create_test::<CounterPlugin>(std::ptr::null(), handle) };
        let b = unsafe { create_test::<CounterPlugin>(std::ptr::null(), handle) };

        unsafe {
            call(a, |v| v.run);
            call(b, |v| v.run);
            call(b, |v| v.run);
        }

        let counter = unsafe { &*(handle as usize as *const AtomicUsize) };
        assert_eq!(counter.load(Ordering::Relaxed), 3);

        unsafe {
            ((*(*a).vtable).release)(a);
            ((*(*b).vtable).release)(b);
            destroy_context::<CounterPlugin>(handle);
        }
    }

    #[test]
    fn test_declined_context_is_null_handle() {
        let handle = unsafe { create_context::<CounterPlugin>(std::ptr::null()) };
        assert_eq!(handle, 0);
        // destroying the null handle is a no-op
        unsafe { destroy_context::<CounterPlugin>(0) };
    }
}
