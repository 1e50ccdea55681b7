//! UTF-16 string helpers
//!
//! Strings cross into the service as NUL-terminated UTF-16. Strings coming
//! back live in memory owned by the component runtime and must be freed by
//! it; [`RemoteMemory`] ties that free to scope exit.

use crate::runtime::ComRuntime;
use std::ffi::c_void;
use std::ptr;

/// Converts `s` to NUL-terminated UTF-16.
///
/// An interior NUL ends the string as seen by the service.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Reads at most `max_len` UTF-16 units from `ptr`, stopping at the first NUL.
///
/// A null `ptr` reads as the empty string. Unpaired surrogates are replaced
/// with U+FFFD.
///
/// # Safety
///
/// `ptr` must be null or valid for reads up to its terminator or `max_len`
/// units, whichever comes first.
pub unsafe fn wide_to_string(ptr: *const u16, max_len: usize) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0;
    while len < max_len && unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    let units = unsafe { std::slice::from_raw_parts(ptr, len) };
    String::from_utf16_lossy(units)
}

/// A block of memory allocated by the component runtime on our behalf.
///
/// Freed through [`ComRuntime::free_remote_memory`] exactly once on drop.
pub struct RemoteMemory<'a, T> {
    ptr: *mut T,
    runtime: &'a dyn ComRuntime,
}

impl<'a, T> RemoteMemory<'a, T> {
    /// # Safety
    ///
    /// `ptr` must be null or a block allocated by `runtime` that nobody else
    /// frees.
    pub unsafe fn new(ptr: *mut T, runtime: &'a dyn ComRuntime) -> Self {
        Self { ptr, runtime }
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

impl RemoteMemory<'_, u16> {
    /// Copies the string out; the block is still freed on drop.
    pub fn read_string(&self, max_len: usize) -> String {
        unsafe { wide_to_string(self.ptr, max_len) }
    }
}

impl<T> Drop for RemoteMemory<'_, T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { self.runtime.free_remote_memory(self.ptr as *mut c_void) };
            self.ptr = ptr::null_mut();
        }
    }
}

/// Copies and frees a remote string in one step.
///
/// # Safety
///
/// Same as [`RemoteMemory::new`].
pub(crate) unsafe fn take_remote_string(
    runtime: &dyn ComRuntime,
    ptr: *mut u16,
    max_len: usize,
) -> String {
    let memory = unsafe { RemoteMemory::new(ptr, runtime) };
    memory.read_string(max_len)
}
