//! Method-table dispatch.
//!
//! A component object is a pointer whose first pointer-width bytes hold the
//! address of its method table. Every call goes through a [`Slot`], which
//! binds an interface marker, a zero-based table index and the native
//! signature of the method stored there. Slot indices are checked against
//! [`Interface::SLOT_COUNT`] when the slot constant is evaluated, so call
//! sites never compute byte offsets themselves.

use super::guid::Guid;
use super::hresult::HResult;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Raw `HRESULT` as returned across the ABI.
pub type RawHResult = i32;

/// Implicit first argument of every component method.
pub type This = *mut c_void;

/// Describes one interface: its identity and the length of its method table
/// (inherited `IUnknown` slots included).
pub trait Interface {
    const NAME: &'static str;
    const IID: Guid;
    const SLOT_COUNT: usize;
}

/// Non-owning reference to a component object together with its cached
/// method table address.
///
/// Copying a `ComObjectRef` does not touch the object's reference count;
/// ownership lives in [`ComPtr`](super::guard::ComPtr).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComObjectRef {
    object: NonNull<c_void>,
    table: NonNull<*const c_void>,
}

impl ComObjectRef {
    /// Reads the method table address out of `ptr`.
    ///
    /// Returns `None` for a null object or a null table.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point at a live component object.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        let object = NonNull::new(ptr)?;
        let table = unsafe { *(ptr as *const *mut *const c_void) };
        let table = NonNull::new(table)?;
        Some(Self { object, table })
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.object.as_ptr()
    }

    /// Address stored at `index` in the method table.
    ///
    /// # Safety
    ///
    /// `index` must lie within the object's method table.
    unsafe fn method(&self, index: usize) -> *const c_void {
        unsafe { *self.table.as_ptr().add(index) }
    }
}

/// A native method signature that can be called with a tuple of arguments.
pub trait Signature: Copy {
    type Args;

    /// # Safety
    ///
    /// `self` must be the method stored in `this`'s table and `args` must
    /// satisfy the method's contract.
    unsafe fn call(self, this: This, args: Self::Args) -> RawHResult;
}

macro_rules! impl_signature {
    ($($ty:ident $val:ident),*) => {
        impl<$($ty),*> Signature for unsafe extern "system" fn(This $(, $ty)*) -> RawHResult {
            type Args = ($($ty,)*);

            unsafe fn call(self, this: This, args: Self::Args) -> RawHResult {
                let ($($val,)*) = args;
                unsafe { self(this $(, $val)*) }
            }
        }
    };
}

impl_signature!();
impl_signature!(A a);
impl_signature!(A a, B b);
impl_signature!(A a, B b, C c);
impl_signature!(A a, B b, C c, D d);

pub type Method0 = unsafe extern "system" fn(This) -> RawHResult;
pub type Method1<A> = unsafe extern "system" fn(This, A) -> RawHResult;
pub type Method2<A, B> = unsafe extern "system" fn(This, A, B) -> RawHResult;
pub type Method3<A, B, C> = unsafe extern "system" fn(This, A, B, C) -> RawHResult;
pub type Method4<A, B, C, D> = unsafe extern "system" fn(This, A, B, C, D) -> RawHResult;

/// Position of one method in an interface's method table.
pub struct Slot<I, F> {
    index: usize,
    name: &'static str,
    _marker: PhantomData<fn() -> (I, F)>,
}

impl<I, F> Clone for Slot<I, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, F> Copy for Slot<I, F> {}

impl<I: Interface, F: Signature> Slot<I, F> {
    /// Fails const evaluation when `index` lies outside the interface's table.
    pub(crate) const fn new(index: usize, name: &'static str) -> Self {
        assert!(index < I::SLOT_COUNT, "slot index outside interface method table");
        Self {
            index,
            name,
            _marker: PhantomData,
        }
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    /// Qualified method name, e.g. `ITask::Run`.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// # Safety
    ///
    /// `object` must implement `I`.
    unsafe fn resolve(&self, object: &ComObjectRef) -> F {
        let address = unsafe { object.method(self.index) };
        debug_assert!(!address.is_null(), "{} has a null table entry", self.name);
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*const c_void>());
        unsafe { std::mem::transmute_copy::<*const c_void, F>(&address) }
    }
}

/// Values a method may write through an out-pointer. Zero is a valid
/// initial state for all of them.
///
/// # Safety
///
/// Implementors must be valid when all-zero.
pub unsafe trait OutParam: Copy {}

unsafe impl OutParam for u16 {}
unsafe impl OutParam for u32 {}
unsafe impl OutParam for i32 {}
unsafe impl<T> OutParam for *mut T {}
unsafe impl<const N: usize> OutParam for [u8; N] {}
unsafe impl<const N: usize> OutParam for [u16; N] {}

/// Calls `slot` on `object` and returns the native status.
///
/// # Safety
///
/// `object` must implement `I` and `args` must satisfy the method's
/// contract (valid pointers, correctly sized buffers).
pub unsafe fn invoke<I: Interface, F: Signature>(
    object: &ComObjectRef,
    slot: Slot<I, F>,
    args: F::Args,
) -> HResult {
    let method = unsafe { slot.resolve(object) };
    HResult(unsafe { method.call(object.as_raw(), args) })
}

/// Calls a method whose only declared argument is an out-pointer and returns
/// the status together with the written value.
///
/// # Safety
///
/// Same as [`invoke`].
pub unsafe fn invoke_out<I: Interface, T: OutParam>(
    object: &ComObjectRef,
    slot: Slot<I, Method1<*mut T>>,
) -> (HResult, T) {
    let mut out: T = unsafe { std::mem::zeroed() };
    let hr = unsafe { invoke(object, slot, (&mut out as *mut T,)) };
    (hr, out)
}
