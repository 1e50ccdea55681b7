//! Method tables of the Task Scheduler 1.0 interfaces.
//!
//! The indices below are part of the binary contract with `mstask.dll`:
//! three inherited `IUnknown` slots followed by each interface's methods in
//! declaration order. They must never be recomputed.

use super::dispatch::{Interface, Method0, Method1, Method2, Method3, Method4, Slot};
use super::guid::Guid;
use std::ffi::c_void;

/// `LPCWSTR`
pub type PCWSTR = *const u16;
/// `LPWSTR*`, filled with remote-owned memory
pub type PPWSTR = *mut *mut u16;
/// `IUnknown**`
pub type PPUnknown = *mut *mut c_void;

/// `CLSID_CTaskScheduler`
pub const CLSID_CTASK_SCHEDULER: Guid = Guid::from_u128(0x148BD52A_A2AB_11CE_B11F_00AA00530503);
/// `CLSID_CTask`
pub const CLSID_CTASK: Guid = Guid::from_u128(0x148BD520_A2AB_11CE_B11F_00AA00530503);

pub enum IUnknown {}
pub enum ITaskScheduler {}
pub enum IEnumWorkItems {}
pub enum ITask {}
pub enum ITaskTrigger {}
pub enum IPersistFile {}

impl Interface for IUnknown {
    const NAME: &'static str = "IUnknown";
    const IID: Guid = Guid::from_u128(0x00000000_0000_0000_C000_000000000046);
    const SLOT_COUNT: usize = 3;
}

impl Interface for ITaskScheduler {
    const NAME: &'static str = "ITaskScheduler";
    const IID: Guid = Guid::from_u128(0x148BD527_A2AB_11CE_B11F_00AA00530503);
    const SLOT_COUNT: usize = 11;
}

impl Interface for IEnumWorkItems {
    const NAME: &'static str = "IEnumWorkItems";
    const IID: Guid = Guid::from_u128(0x148BD528_A2AB_11CE_B11F_00AA00530503);
    const SLOT_COUNT: usize = 7;
}

impl Interface for ITask {
    const NAME: &'static str = "ITask";
    const IID: Guid = Guid::from_u128(0x148BD524_A2AB_11CE_B11F_00AA00530503);
    const SLOT_COUNT: usize = 44;
}

impl Interface for ITaskTrigger {
    const NAME: &'static str = "ITaskTrigger";
    const IID: Guid = Guid::from_u128(0x148BD52B_A2AB_11CE_B11F_00AA00530503);
    const SLOT_COUNT: usize = 6;
}

impl Interface for IPersistFile {
    const NAME: &'static str = "IPersistFile";
    const IID: Guid = Guid::from_u128(0x0000010B_0000_0000_C000_000000000046);
    const SLOT_COUNT: usize = 9;
}

/// Slots inherited by every interface.
pub mod unknown {
    use super::*;

    pub const fn query_interface<I: Interface>() -> Slot<I, Method2<*const Guid, PPUnknown>> {
        Slot::new(0, "IUnknown::QueryInterface")
    }

    pub const fn add_ref<I: Interface>() -> Slot<I, Method0> {
        Slot::new(1, "IUnknown::AddRef")
    }

    pub const fn release<I: Interface>() -> Slot<I, Method0> {
        Slot::new(2, "IUnknown::Release")
    }
}

pub mod scheduler {
    use super::*;

    pub const SET_TARGET_COMPUTER: Slot<ITaskScheduler, Method1<PCWSTR>> =
        Slot::new(3, "ITaskScheduler::SetTargetComputer");
    pub const GET_TARGET_COMPUTER: Slot<ITaskScheduler, Method1<PPWSTR>> =
        Slot::new(4, "ITaskScheduler::GetTargetComputer");
    pub const ENUM: Slot<ITaskScheduler, Method1<PPUnknown>> =
        Slot::new(5, "ITaskScheduler::Enum");
    pub const ACTIVATE: Slot<ITaskScheduler, Method3<PCWSTR, *const Guid, PPUnknown>> =
        Slot::new(6, "ITaskScheduler::Activate");
    pub const DELETE: Slot<ITaskScheduler, Method1<PCWSTR>> =
        Slot::new(7, "ITaskScheduler::Delete");
    pub const NEW_WORK_ITEM: Slot<
        ITaskScheduler,
        Method4<PCWSTR, *const Guid, *const Guid, PPUnknown>,
    > = Slot::new(8, "ITaskScheduler::NewWorkItem");
}

pub mod enum_work_items {
    use super::*;

    /// `Next(celt, LPWSTR** rgpwszNames, ULONG* pceltFetched)`
    pub const NEXT: Slot<IEnumWorkItems, Method3<u32, *mut PPWSTR, *mut u32>> =
        Slot::new(3, "IEnumWorkItems::Next");
}

pub mod task {
    use super::*;

    pub const CREATE_TRIGGER: Slot<ITask, Method2<*mut u16, PPUnknown>> =
        Slot::new(3, "ITask::CreateTrigger");
    pub const DELETE_TRIGGER: Slot<ITask, Method1<u16>> = Slot::new(4, "ITask::DeleteTrigger");
    pub const GET_TRIGGER_COUNT: Slot<ITask, Method1<*mut u16>> =
        Slot::new(5, "ITask::GetTriggerCount");
    pub const GET_TRIGGER: Slot<ITask, Method2<u16, PPUnknown>> = Slot::new(6, "ITask::GetTrigger");
    pub const GET_TRIGGER_STRING: Slot<ITask, Method2<u16, PPWSTR>> =
        Slot::new(7, "ITask::GetTriggerString");
    pub const GET_NEXT_RUN_TIME: Slot<ITask, Method1<*mut [u16; 8]>> =
        Slot::new(9, "ITask::GetNextRunTime");
    pub const RUN: Slot<ITask, Method0> = Slot::new(12, "ITask::Run");
    pub const TERMINATE: Slot<ITask, Method0> = Slot::new(13, "ITask::Terminate");
    pub const GET_MOST_RECENT_RUN_TIME: Slot<ITask, Method1<*mut [u16; 8]>> =
        Slot::new(15, "ITask::GetMostRecentRunTime");
    pub const GET_STATUS: Slot<ITask, Method1<*mut i32>> = Slot::new(16, "ITask::GetStatus");
    pub const GET_EXIT_CODE: Slot<ITask, Method1<*mut u32>> = Slot::new(17, "ITask::GetExitCode");
    pub const SET_COMMENT: Slot<ITask, Method1<PCWSTR>> = Slot::new(18, "ITask::SetComment");
    pub const GET_COMMENT: Slot<ITask, Method1<PPWSTR>> = Slot::new(19, "ITask::GetComment");
    pub const SET_CREATOR: Slot<ITask, Method1<PCWSTR>> = Slot::new(20, "ITask::SetCreator");
    pub const GET_CREATOR: Slot<ITask, Method1<PPWSTR>> = Slot::new(21, "ITask::GetCreator");
    pub const SET_FLAGS: Slot<ITask, Method1<u32>> = Slot::new(28, "ITask::SetFlags");
    pub const GET_FLAGS: Slot<ITask, Method1<*mut u32>> = Slot::new(29, "ITask::GetFlags");
    pub const SET_ACCOUNT_INFORMATION: Slot<ITask, Method2<PCWSTR, PCWSTR>> =
        Slot::new(30, "ITask::SetAccountInformation");
    pub const GET_ACCOUNT_INFORMATION: Slot<ITask, Method1<PPWSTR>> =
        Slot::new(31, "ITask::GetAccountInformation");
    pub const SET_APPLICATION_NAME: Slot<ITask, Method1<PCWSTR>> =
        Slot::new(32, "ITask::SetApplicationName");
    pub const GET_APPLICATION_NAME: Slot<ITask, Method1<PPWSTR>> =
        Slot::new(33, "ITask::GetApplicationName");
    pub const SET_PARAMETERS: Slot<ITask, Method1<PCWSTR>> = Slot::new(34, "ITask::SetParameters");
    pub const GET_PARAMETERS: Slot<ITask, Method1<PPWSTR>> = Slot::new(35, "ITask::GetParameters");
    pub const SET_WORKING_DIRECTORY: Slot<ITask, Method1<PCWSTR>> =
        Slot::new(36, "ITask::SetWorkingDirectory");
    pub const GET_WORKING_DIRECTORY: Slot<ITask, Method1<PPWSTR>> =
        Slot::new(37, "ITask::GetWorkingDirectory");
    pub const SET_PRIORITY: Slot<ITask, Method1<u32>> = Slot::new(38, "ITask::SetPriority");
    pub const GET_PRIORITY: Slot<ITask, Method1<*mut u32>> = Slot::new(39, "ITask::GetPriority");
    pub const SET_MAX_RUN_TIME: Slot<ITask, Method1<u32>> = Slot::new(42, "ITask::SetMaxRunTime");
    pub const GET_MAX_RUN_TIME: Slot<ITask, Method1<*mut u32>> =
        Slot::new(43, "ITask::GetMaxRunTime");
}

pub mod task_trigger {
    use super::*;
    use crate::trigger::codec::TRIGGER_SIZE;

    pub const SET_TRIGGER: Slot<ITaskTrigger, Method1<*const [u8; TRIGGER_SIZE]>> =
        Slot::new(3, "ITaskTrigger::SetTrigger");
    pub const GET_TRIGGER: Slot<ITaskTrigger, Method1<*mut [u8; TRIGGER_SIZE]>> =
        Slot::new(4, "ITaskTrigger::GetTrigger");
    pub const GET_TRIGGER_STRING: Slot<ITaskTrigger, Method1<PPWSTR>> =
        Slot::new(5, "ITaskTrigger::GetTriggerString");
}

pub mod persist_file {
    use super::*;

    /// `Save(LPCOLESTR pszFileName, BOOL fRemember)`
    pub const SAVE: Slot<IPersistFile, Method2<PCWSTR, i32>> = Slot::new(6, "IPersistFile::Save");
}
