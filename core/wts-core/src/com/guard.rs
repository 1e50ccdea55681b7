//! Owning component object pointer.

use super::dispatch::{self, ComObjectRef, Interface, Method1, OutParam, Signature, Slot};
use super::guid::Guid;
use super::hresult::{E_POINTER, HResult};
use super::interfaces::unknown;
use crate::error::{WtsError, WtsResult};
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

/// Holds one reference to a component object implementing `I` and calls
/// `IUnknown::Release` exactly once when dropped.
///
/// `ComPtr` is move-only; use [`ComPtr::into_raw`] to hand the reference
/// to someone else. It is neither `Send` nor `Sync`.
pub struct ComPtr<I: Interface> {
    object: ComObjectRef,
    _marker: PhantomData<*const I>,
}

impl<I: Interface> ComPtr<I> {
    /// Takes ownership of one reference. Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live object implementing `I` whose reference
    /// the caller owns and will not release itself.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        let object = unsafe { ComObjectRef::from_raw(ptr) }?;
        Some(Self {
            object,
            _marker: PhantomData,
        })
    }

    /// Takes ownership of an object written into an out-pointer by `method`.
    ///
    /// A successful status with a null pointer is reported as `E_POINTER`.
    ///
    /// # Safety
    ///
    /// Same as [`ComPtr::from_raw`].
    pub(crate) unsafe fn from_out(
        hr: HResult,
        ptr: *mut c_void,
        method: &'static str,
    ) -> WtsResult<Self> {
        hr.check(method)?;
        unsafe { Self::from_raw(ptr) }.ok_or(WtsError::CommandFailed {
            method,
            code: E_POINTER.code(),
        })
    }

    pub fn object(&self) -> &ComObjectRef {
        &self.object
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.object.as_raw()
    }

    /// Gives up ownership without releasing.
    pub fn into_raw(self) -> *mut c_void {
        let raw = self.as_raw();
        std::mem::forget(self);
        raw
    }

    /// # Safety
    ///
    /// `args` must satisfy the method's contract.
    pub unsafe fn invoke<F: Signature>(&self, slot: Slot<I, F>, args: F::Args) -> HResult {
        unsafe { dispatch::invoke(&self.object, slot, args) }
    }

    /// # Safety
    ///
    /// The method must only write a `T` through its out-pointer.
    pub unsafe fn invoke_out<T: OutParam>(&self, slot: Slot<I, Method1<*mut T>>) -> (HResult, T) {
        unsafe { dispatch::invoke_out(&self.object, slot) }
    }

    /// `IUnknown::QueryInterface` for `J`.
    pub fn query<J: Interface>(&self) -> WtsResult<ComPtr<J>> {
        let iid = J::IID;
        let mut out: *mut c_void = ptr::null_mut();
        let slot = unknown::query_interface::<I>();
        let hr = unsafe { self.invoke(slot, (&iid as *const Guid, &mut out as *mut *mut c_void)) };
        unsafe { ComPtr::from_out(hr, out, slot.name()) }
    }
}

impl<I: Interface> Drop for ComPtr<I> {
    fn drop(&mut self) {
        unsafe {
            dispatch::invoke(&self.object, unknown::release::<I>(), ());
        }
    }
}

impl<I: Interface> fmt::Debug for ComPtr<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComPtr")
            .field("interface", &I::NAME)
            .field("object", &self.as_raw())
            .finish()
    }
}
