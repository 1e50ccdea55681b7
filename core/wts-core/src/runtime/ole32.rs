//! `ole32` backed runtime.

use super::ComRuntime;
use crate::com::ComPtr;
use crate::com::interfaces::{CLSID_CTASK_SCHEDULER, ITaskScheduler, IUnknown};
use crate::error::{WtsError, WtsResult};
use std::ffi::c_void;
use windows::Win32::System::Com::{
    CLSCTX_INPROC_SERVER, COINIT_APARTMENTTHREADED, CoCreateInstance, CoInitializeEx,
    CoTaskMemFree, CoUninitialize,
};
use windows::core::{GUID, Interface as _};

/// The operating system's component runtime, single-threaded apartment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ole32Runtime;

impl ComRuntime for Ole32Runtime {
    fn initialize(&self) -> WtsResult<()> {
        unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }
            .ok()
            .map_err(|e| WtsError::RuntimeUnavailable(format!("CoInitializeEx: {e}")))
    }

    fn shutdown(&self) {
        unsafe { CoUninitialize() };
    }

    fn create_scheduler(&self) -> WtsResult<ComPtr<ITaskScheduler>> {
        let clsid = GUID::from_u128(CLSID_CTASK_SCHEDULER.to_u128());
        let unknown: windows::core::IUnknown =
            unsafe { CoCreateInstance(&clsid, None, CLSCTX_INPROC_SERVER) }.map_err(|e| {
                WtsError::CommandFailed {
                    method: "CoCreateInstance",
                    code: e.code().0 as u32,
                }
            })?;
        let unknown = unsafe { ComPtr::<IUnknown>::from_raw(unknown.into_raw()) }.ok_or(
            WtsError::RuntimeUnavailable("CoCreateInstance returned null".to_string()),
        )?;
        unknown.query::<ITaskScheduler>()
    }

    unsafe fn free_remote_memory(&self, ptr: *mut c_void) {
        if !ptr.is_null() {
            unsafe { CoTaskMemFree(Some(ptr as *const c_void)) };
        }
    }
}
