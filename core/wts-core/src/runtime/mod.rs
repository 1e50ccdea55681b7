//! Component runtime session
//!
//! The component runtime (`CoInitializeEx` / `CoUninitialize` on Windows)
//! is process state. [`Session`] makes it an explicit value: opened once,
//! restarted when a saved job forces it, shut down on drop.
//!
//! [`ComRuntime`] is the seam between the facade and the host: the Windows
//! build ships [`Ole32Runtime`], and callers may provide their own.

#[cfg(windows)]
mod ole32;

#[cfg(windows)]
pub use self::ole32::Ole32Runtime;

use crate::com::ComPtr;
use crate::com::interfaces::ITaskScheduler;
use crate::error::WtsResult;
use std::ffi::c_void;
use std::fmt;
use tracing::debug;

/// Host services the scheduler facade depends on.
pub trait ComRuntime {
    /// Initializes the component runtime for the calling thread.
    fn initialize(&self) -> WtsResult<()>;

    /// Balances one successful [`ComRuntime::initialize`].
    fn shutdown(&self);

    /// Creates a new scheduler root object.
    fn create_scheduler(&self) -> WtsResult<ComPtr<ITaskScheduler>>;

    /// Frees a block the runtime allocated for a method result.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a block returned through an out-parameter of a
    /// component method, not yet freed.
    unsafe fn free_remote_memory(&self, ptr: *mut c_void);
}

/// 런타임 세션
///
/// Owns one initialization of a [`ComRuntime`].
pub struct Session {
    runtime: Box<dyn ComRuntime>,
    active: bool,
}

impl Session {
    /// Initializes `runtime` and takes ownership of it.
    pub fn open(runtime: impl ComRuntime + 'static) -> WtsResult<Self> {
        let runtime: Box<dyn ComRuntime> = Box::new(runtime);
        runtime.initialize()?;
        debug!("component runtime initialized");
        Ok(Self {
            runtime,
            active: true,
        })
    }

    /// Session over the operating system's runtime.
    #[cfg(windows)]
    pub fn system() -> WtsResult<Self> {
        Self::open(Ole32Runtime)
    }

    /// Shuts the runtime down and initializes it again.
    ///
    /// Every object created under the old session must already be released.
    /// On failure the session stays inactive and a later `restart` may retry.
    pub fn restart(&mut self) -> WtsResult<()> {
        if self.active {
            self.runtime.shutdown();
            self.active = false;
        }
        self.runtime.initialize()?;
        self.active = true;
        debug!("component runtime restarted");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn runtime(&self) -> &dyn ComRuntime {
        self.runtime.as_ref()
    }

    pub fn create_scheduler(&self) -> WtsResult<ComPtr<ITaskScheduler>> {
        self.runtime.create_scheduler()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.active {
            self.runtime.shutdown();
            self.active = false;
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
