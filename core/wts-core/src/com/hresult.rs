//! Native status codes returned by component methods.

use crate::error::{WtsError, WtsResult};
use std::fmt;

/// Wrapper around a native `HRESULT`.
///
/// Non-negative values are successes (`S_OK` plus informational codes such
/// as `S_FALSE` or the `SCHED_S_*` family); values with the top bit set are
/// failures.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HResult(pub i32);

impl HResult {
    pub const fn from_code(code: u32) -> Self {
        HResult(code as i32)
    }

    /// Exactly `S_OK`.
    pub const fn is_ok(self) -> bool {
        self.0 == S_OK.0
    }

    /// `S_OK` or any informational status.
    pub const fn succeeded(self) -> bool {
        self.0 >= 0
    }

    pub const fn failed(self) -> bool {
        self.0 < 0
    }

    /// Status bits as an unsigned value (how the service documents them).
    pub const fn code(self) -> u32 {
        self.0 as u32
    }

    /// Maps a failure to [`WtsError::CommandFailed`] for `method`.
    pub fn check(self, method: &'static str) -> WtsResult<Self> {
        if self.succeeded() {
            Ok(self)
        } else {
            Err(WtsError::CommandFailed {
                method,
                code: self.code(),
            })
        }
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult({:#010x})", self.code())
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.code())
    }
}

pub const S_OK: HResult = HResult(0);
pub const S_FALSE: HResult = HResult(1);

pub const E_NOTIMPL: HResult = HResult::from_code(0x8000_4001);
pub const E_NOINTERFACE: HResult = HResult::from_code(0x8000_4002);
pub const E_POINTER: HResult = HResult::from_code(0x8000_4003);
pub const E_INVALIDARG: HResult = HResult::from_code(0x8007_0057);
/// `HRESULT_FROM_WIN32(ERROR_FILE_NOT_FOUND)`
pub const E_FILE_NOT_FOUND: HResult = HResult::from_code(0x8007_0002);
/// `HRESULT_FROM_WIN32(ERROR_FILE_EXISTS)`
pub const E_FILE_EXISTS: HResult = HResult::from_code(0x8007_0050);

// Task Scheduler informational codes
pub const SCHED_S_TASK_READY: HResult = HResult::from_code(0x0004_1300);
pub const SCHED_S_TASK_RUNNING: HResult = HResult::from_code(0x0004_1301);
pub const SCHED_S_TASK_DISABLED: HResult = HResult::from_code(0x0004_1302);
pub const SCHED_S_TASK_HAS_NOT_RUN: HResult = HResult::from_code(0x0004_1303);
pub const SCHED_S_TASK_NO_MORE_RUNS: HResult = HResult::from_code(0x0004_1304);
pub const SCHED_S_TASK_NOT_SCHEDULED: HResult = HResult::from_code(0x0004_1305);
pub const SCHED_S_TASK_TERMINATED: HResult = HResult::from_code(0x0004_1306);
pub const SCHED_S_TASK_NO_VALID_TRIGGERS: HResult = HResult::from_code(0x0004_1307);
pub const SCHED_S_EVENT_TRIGGER: HResult = HResult::from_code(0x0004_1308);

// Task Scheduler failures with special handling
pub const SCHED_E_TRIGGER_NOT_FOUND: HResult = HResult::from_code(0x8004_1309);
pub const SCHED_E_TASK_NOT_READY: HResult = HResult::from_code(0x8004_130A);
pub const SCHED_E_TASK_NOT_RUNNING: HResult = HResult::from_code(0x8004_130B);
pub const SCHED_E_ACCOUNT_INFORMATION_NOT_SET: HResult = HResult::from_code(0x8004_130F);
pub const SCHED_E_NO_SECURITY_SERVICES: HResult = HResult::from_code(0x8004_1312);
