//! C-ABI exports under the classic `ff_*` / `bf_*` / `ts_*` names.
//!
//! Gated behind `features = ["ffi"]`. Built into the staticlib, so C test
//! drivers written against a `my_malloc.h` style header link unchanged.

use std::ffi::{c_ulong, c_void};

use crate::malloc;

#[unsafe(no_mangle)]
pub extern "C" fn ff_malloc(size: usize) -> *mut c_void {
    malloc::allocate_first_fit(size).cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn ff_free(ptr: *mut c_void) {
    unsafe { malloc::free_first_fit(ptr.cast()) }
}

#[unsafe(no_mangle)]
pub extern "C" fn bf_malloc(size: usize) -> *mut c_void {
    malloc::allocate_best_fit(size).cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn bf_free(ptr: *mut c_void) {
    unsafe { malloc::free_best_fit(ptr.cast()) }
}

#[unsafe(no_mangle)]
pub extern "C" fn ts_malloc_lock(size: usize) -> *mut c_void {
    malloc::allocate_threadsafe_locked(size).cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn ts_free_lock(ptr: *mut c_void) {
    unsafe { malloc::free_threadsafe_locked(ptr.cast()) }
}

#[unsafe(no_mangle)]
pub extern "C" fn ts_malloc_nolock(size: usize) -> *mut c_void {
    malloc::allocate_threadsafe_unlocked(size).cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn ts_free_nolock(ptr: *mut c_void) {
    unsafe { malloc::free_threadsafe_unlocked(ptr.cast()) }
}

/// In bytes.
#[unsafe(no_mangle)]
pub extern "C" fn get_data_segment_size() -> c_ulong {
    malloc::segment_bytes_total() as c_ulong
}

/// In bytes, calling thread only.
#[unsafe(no_mangle)]
pub extern "C" fn get_data_segment_free_space_size() -> c_ulong {
    malloc::segment_bytes_free() as c_ulong
}
