//! Timing helpers and CPU affinity

use std::time::Instant;

/// Nanoseconds from `earlier` to `later`, saturating at zero and `u64::MAX`
#[inline(always)]
pub fn nanos_between(earlier: Instant, later: Instant) -> u64 {
    let nanos = later.saturating_duration_since(earlier).as_nanos();
    u64::try_from(nanos).unwrap_or(u64::MAX)
}

/// Set CPU affinity to pin the current thread to a specific core
///
/// Keeps a worker from migrating between cores mid-run.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// No-op where thread affinity is unsupported
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    // CPU pinning not supported on this platform
    Ok(())
}
