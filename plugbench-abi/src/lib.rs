#![warn(missing_docs)]
//! Plugbench Plugin ABI
//!
//! Fixed-layout C function table shared between the plugbench host and test
//! plugins. A plugin is a native module (`cdylib`) exporting:
//!
//! | symbol               | signature                                             | required |
//! |----------------------|-------------------------------------------------------|----------|
//! | `bt_version`         | `fn() -> c_int`                                       | yes      |
//! | `bt_create_test`     | `fn(initializer: *const c_char, context: u64) -> *mut TestObject` | yes |
//! | `bt_create_context`  | `fn(initializer: *const c_char) -> u64`               | no       |
//! | `bt_destroy_context` | `fn(context: u64)`                                    | no       |
//!
//! The host checks `bt_version` against [`BENCH_ABI_VERSION`] before touching
//! any other symbol. No panic or error crosses the boundary: a zero return
//! from a capability means "stop", a null instance means "creation failed".
//!
//! Plugins written in Rust should use the [`sdk`] traits and [`export_plugin!`]
//! instead of implementing the table by hand.

use std::ffi::{c_char, c_int};

pub mod sdk;

pub use sdk::{BenchPlugin, BenchTest};

/// ABI version the host expects. Any other value is rejected at load time.
pub const BENCH_ABI_VERSION: c_int = 3;

/// Name of the version-query symbol
pub const SYM_VERSION: &[u8] = b"bt_version\0";
/// Name of the instance-creation symbol
pub const SYM_CREATE_TEST: &[u8] = b"bt_create_test\0";
/// Name of the optional context-creation symbol
pub const SYM_CREATE_CONTEXT: &[u8] = b"bt_create_context\0";
/// Name of the optional context-destruction symbol
pub const SYM_DESTROY_CONTEXT: &[u8] = b"bt_destroy_context\0";

/// `bt_version`
pub type VersionFn = unsafe extern "C" fn() -> c_int;
/// `bt_create_test`
pub type CreateTestFn =
    unsafe extern "C" fn(initializer: *const c_char, context: u64) -> *mut TestObject;
/// `bt_create_context`
pub type CreateContextFn = unsafe extern "C" fn(initializer: *const c_char) -> u64;
/// `bt_destroy_context`
pub type DestroyContextFn = unsafe extern "C" fn(context: u64);

/// Capability call returning non-zero to continue, zero to stop
pub type CapabilityFn = unsafe extern "C" fn(this: *mut TestObject) -> c_int;
/// Instance release
pub type ReleaseFn = unsafe extern "C" fn(this: *mut TestObject);

/// Per-instance capability table
#[repr(C)]
#[derive(Debug)]
pub struct TestVTable {
    /// Called before every sample, outside the measured region
    pub run_before: CapabilityFn,
    /// The measured unit
    pub run: CapabilityFn,
    /// Called after every recorded sample, outside the measured region
    pub run_after: CapabilityFn,
    /// Frees the instance; the pointer is dangling afterwards
    pub release: ReleaseFn,
}

/// Header of every plugin test instance.
///
/// Plugins place this as the first field of a `#[repr(C)]` object so a
/// `*mut TestObject` can be cast back to the full object inside the vtable
/// functions.
#[repr(C)]
#[derive(Debug)]
pub struct TestObject {
    /// Capability table for this instance
    pub vtable: *const TestVTable,
}

/// The resolved plugin entry points
#[derive(Debug, Clone, Copy)]
pub struct PluginTable {
    /// `bt_version`
    pub version: VersionFn,
    /// `bt_create_test`
    pub create_test: CreateTestFn,
    /// `bt_create_context` / `bt_destroy_context`, present only as a pair
    pub contexts: Option<ContextTable>,
}

/// Optional context capability of a plugin
#[derive(Debug, Clone, Copy)]
pub struct ContextTable {
    /// `bt_create_context`
    pub create: CreateContextFn,
    /// `bt_destroy_context`
    pub destroy: DestroyContextFn,
}
