//! Job operations
//!
//! 바인딩된 작업(`ITask`)에 대한 연산. Every method here fails with
//! [`WtsError::ResourceUnavailable`] while no job is bound; see
//! [`TaskScheduler::activate`] and [`TaskScheduler::new_job`].

use crate::com::dispatch::{Method1, Slot};
use crate::com::hresult::{
    HResult, SCHED_E_ACCOUNT_INFORMATION_NOT_SET, SCHED_E_NO_SECURITY_SERVICES,
    SCHED_S_TASK_HAS_NOT_RUN, SCHED_S_TASK_NOT_SCHEDULED, SCHED_S_TASK_READY,
    SCHED_S_TASK_RUNNING,
};
use crate::com::interfaces::{
    IPersistFile, ITask, ITaskTrigger, PCWSTR, PPUnknown, PPWSTR, persist_file, task,
    task_trigger,
};
use crate::com::ComPtr;
use crate::error::{WtsError, WtsResult};
use crate::scheduler::{TaskScheduler, write_trigger};
use crate::time::{SystemTime, from_system_time};
use crate::trigger::Trigger;
use crate::trigger::codec::{self, TriggerBuffer};
use crate::wide::{RemoteMemory, to_wide};
use chrono::NaiveDateTime;
use std::ffi::c_void;
use std::fmt;
use std::path::Path;
use std::ptr;
use tracing::{debug, info, instrument, warn};

pub(crate) const NO_JOB: &str = "no currently active job";

/// `ITask::SetMaxRunTime` value meaning "no limit", in minutes.
pub const INFINITE_RUN_TIME: u32 = u32::MAX;

const MS_PER_MINUTE: u32 = 60_000;

/// Job flags (`TASK_FLAG_*`).
pub mod job_flags {
    pub const INTERACTIVE: u32 = 0x1;
    pub const DELETE_WHEN_DONE: u32 = 0x2;
    pub const DISABLED: u32 = 0x4;
    pub const START_ONLY_IF_IDLE: u32 = 0x10;
    pub const KILL_ON_IDLE_END: u32 = 0x20;
    pub const DONT_START_IF_ON_BATTERIES: u32 = 0x40;
    pub const KILL_IF_GOING_ON_BATTERIES: u32 = 0x80;
    pub const RUN_ONLY_IF_DOCKED: u32 = 0x100;
    pub const HIDDEN: u32 = 0x200;
    pub const RUN_IF_CONNECTED_TO_INTERNET: u32 = 0x400;
    pub const RESTART_ON_IDLE_RESUME: u32 = 0x800;
    pub const SYSTEM_REQUIRED: u32 = 0x1000;
    pub const RUN_ONLY_IF_LOGGED_ON: u32 = 0x2000;
}

/// 프로세스 우선순위 클래스
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Idle,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    Realtime,
    /// No recognized class bit set.
    Unknown,
}

impl Priority {
    pub const IDLE_PRIORITY_CLASS: u32 = 0x40;
    pub const BELOW_NORMAL_PRIORITY_CLASS: u32 = 0x4000;
    pub const NORMAL_PRIORITY_CLASS: u32 = 0x20;
    pub const ABOVE_NORMAL_PRIORITY_CLASS: u32 = 0x8000;
    pub const HIGH_PRIORITY_CLASS: u32 = 0x80;
    pub const REALTIME_PRIORITY_CLASS: u32 = 0x100;

    /// Classes in the order they are tested against a mask.
    const PRECEDENCE: [Priority; 6] = [
        Priority::Idle,
        Priority::BelowNormal,
        Priority::Normal,
        Priority::AboveNormal,
        Priority::High,
        Priority::Realtime,
    ];

    /// First class, in precedence order, whose bit is set in `mask`.
    pub fn from_mask(mask: u32) -> Self {
        Self::PRECEDENCE
            .into_iter()
            .find(|p| p.mask().is_some_and(|bit| mask & bit != 0))
            .unwrap_or(Priority::Unknown)
    }

    pub fn mask(self) -> Option<u32> {
        match self {
            Priority::Idle => Some(Self::IDLE_PRIORITY_CLASS),
            Priority::BelowNormal => Some(Self::BELOW_NORMAL_PRIORITY_CLASS),
            Priority::Normal => Some(Self::NORMAL_PRIORITY_CLASS),
            Priority::AboveNormal => Some(Self::ABOVE_NORMAL_PRIORITY_CLASS),
            Priority::High => Some(Self::HIGH_PRIORITY_CLASS),
            Priority::Realtime => Some(Self::REALTIME_PRIORITY_CLASS),
            Priority::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Idle => "idle",
            Priority::BelowNormal => "below_normal",
            Priority::Normal => "normal",
            Priority::AboveNormal => "above_normal",
            Priority::High => "high",
            Priority::Realtime => "realtime",
            Priority::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job state as reported by `ITask::GetStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Ready,
    Running,
    NotScheduled,
    /// Any other status, kept raw.
    Unknown(HResult),
}

impl JobStatus {
    pub fn from_status(status: HResult) -> Self {
        match status {
            SCHED_S_TASK_READY => JobStatus::Ready,
            SCHED_S_TASK_RUNNING => JobStatus::Running,
            SCHED_S_TASK_NOT_SCHEDULED => JobStatus::NotScheduled,
            other => JobStatus::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Ready => "ready",
            JobStatus::Running => "running",
            JobStatus::NotScheduled => "not scheduled",
            JobStatus::Unknown(_) => "unknown",
        }
    }
}

impl TaskScheduler {
    // ═══════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════

    /// Starts the bound job now.
    #[instrument(skip(self))]
    pub fn run(&self) -> WtsResult<()> {
        let job = self.job()?;
        unsafe { job.invoke(task::RUN, ()) }.check(task::RUN.name())?;
        info!("job started");
        Ok(())
    }

    /// Stops the running instance of the bound job.
    #[instrument(skip(self))]
    pub fn terminate(&self) -> WtsResult<()> {
        let job = self.job()?;
        unsafe { job.invoke(task::TERMINATE, ()) }.check(task::TERMINATE.name())?;
        info!("job terminated");
        Ok(())
    }

    /// Persists the bound job to `path`, or to the job store when `None`.
    ///
    /// Afterwards no job is bound and the runtime session and scheduler root
    /// have been recreated. If the write itself fails the job stays bound.
    #[instrument(skip(self))]
    pub fn save(&mut self, path: Option<&Path>) -> WtsResult<()> {
        let job = self.job()?;
        let file = match path {
            Some(path) => Some(to_wide(path.to_str().ok_or_else(|| {
                WtsError::InvalidArgument(format!("path is not valid unicode: {}", path.display()))
            })?)),
            None => None,
        };
        let file_ptr: PCWSTR = file.as_ref().map_or(ptr::null(), |w| w.as_ptr());

        let persist = job.query::<IPersistFile>()?;
        unsafe { persist.invoke(persist_file::SAVE, (file_ptr, 1)) }
            .check(persist_file::SAVE.name())?;
        drop(persist);

        // every object must be gone before the runtime is torn down
        self.job = None;
        self.root = None;
        self.session.restart()?;
        self.root = Some(self.session.create_scheduler()?);
        self.apply_target_host()?;

        info!("job saved");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Properties
    // ═══════════════════════════════════════════════════════════════

    fn get_string(&self, slot: Slot<ITask, Method1<PPWSTR>>) -> WtsResult<String> {
        let job = self.job()?;
        let (hr, raw) = unsafe { job.invoke_out(slot) };
        let text = unsafe { RemoteMemory::new(raw, self.runtime()) };
        hr.check(slot.name())?;
        Ok(text.read_string(self.max_name_len()))
    }

    fn set_string(&self, slot: Slot<ITask, Method1<PCWSTR>>, value: &str) -> WtsResult<()> {
        let job = self.job()?;
        let wide = to_wide(value);
        unsafe { job.invoke(slot, (wide.as_ptr(),)) }.check(slot.name())?;
        debug!(method = slot.name(), "property set");
        Ok(())
    }

    fn get_u32(&self, slot: Slot<ITask, Method1<*mut u32>>) -> WtsResult<u32> {
        let job = self.job()?;
        let (hr, value) = unsafe { job.invoke_out(slot) };
        hr.check(slot.name())?;
        Ok(value)
    }

    fn set_u32(&self, slot: Slot<ITask, Method1<u32>>, value: u32) -> WtsResult<()> {
        let job = self.job()?;
        unsafe { job.invoke(slot, (value,)) }.check(slot.name())?;
        debug!(method = slot.name(), value, "property set");
        Ok(())
    }

    /// Program the job runs.
    pub fn application_path(&self) -> WtsResult<String> {
        self.get_string(task::GET_APPLICATION_NAME)
    }

    pub fn set_application_path(&mut self, path: &str) -> WtsResult<()> {
        self.set_string(task::SET_APPLICATION_NAME, path)
    }

    /// Command-line arguments passed to the program.
    pub fn arguments(&self) -> WtsResult<String> {
        self.get_string(task::GET_PARAMETERS)
    }

    pub fn set_arguments(&mut self, arguments: &str) -> WtsResult<()> {
        self.set_string(task::SET_PARAMETERS, arguments)
    }

    pub fn working_directory(&self) -> WtsResult<String> {
        self.get_string(task::GET_WORKING_DIRECTORY)
    }

    pub fn set_working_directory(&mut self, dir: &str) -> WtsResult<()> {
        self.set_string(task::SET_WORKING_DIRECTORY, dir)
    }

    pub fn comment(&self) -> WtsResult<String> {
        self.get_string(task::GET_COMMENT)
    }

    pub fn set_comment(&mut self, comment: &str) -> WtsResult<()> {
        self.set_string(task::SET_COMMENT, comment)
    }

    pub fn creator(&self) -> WtsResult<String> {
        self.get_string(task::GET_CREATOR)
    }

    pub fn set_creator(&mut self, creator: &str) -> WtsResult<()> {
        self.set_string(task::SET_CREATOR, creator)
    }

    pub fn priority(&self) -> WtsResult<Priority> {
        self.get_u32(task::GET_PRIORITY).map(Priority::from_mask)
    }

    /// Fails with `InvalidArgument` for [`Priority::Unknown`].
    pub fn set_priority(&mut self, priority: Priority) -> WtsResult<()> {
        let mask = priority
            .mask()
            .ok_or_else(|| WtsError::InvalidArgument("priority 'unknown' cannot be set".into()))?;
        self.set_u32(task::SET_PRIORITY, mask)
    }

    /// See [`job_flags`].
    pub fn flags(&self) -> WtsResult<u32> {
        self.get_u32(task::GET_FLAGS)
    }

    pub fn set_flags(&mut self, flags: u32) -> WtsResult<()> {
        self.set_u32(task::SET_FLAGS, flags)
    }

    /// Longest a run may last, in minutes ([`INFINITE_RUN_TIME`] for no limit).
    pub fn max_run_minutes(&self) -> WtsResult<u32> {
        let millis = self.get_u32(task::GET_MAX_RUN_TIME)?;
        Ok(match millis {
            u32::MAX => INFINITE_RUN_TIME,
            millis => millis / MS_PER_MINUTE,
        })
    }

    /// Values too large for the millisecond field become "no limit".
    pub fn set_max_run_minutes(&mut self, minutes: u32) -> WtsResult<()> {
        self.set_u32(task::SET_MAX_RUN_TIME, minutes.saturating_mul(MS_PER_MINUTE))
    }

    // ═══════════════════════════════════════════════════════════════
    // Account
    // ═══════════════════════════════════════════════════════════════

    /// Sets the account the job runs as.
    ///
    /// An empty `user` with an empty or absent `password` clears stored
    /// credentials. Returns `Ok(false)` when the service keeps the job but
    /// rejects the account information.
    #[instrument(skip(self, password))]
    pub fn set_account(&mut self, user: &str, password: Option<&str>) -> WtsResult<bool> {
        let job = self.job()?;
        let clear = user.is_empty() && password.is_none_or(str::is_empty);

        let user_w = to_wide(user);
        let password_w = match password {
            Some(password) if !clear => Some(to_wide(password)),
            _ => None,
        };
        let password_ptr: PCWSTR = password_w.as_ref().map_or(ptr::null(), |w| w.as_ptr());

        let hr = unsafe {
            job.invoke(
                task::SET_ACCOUNT_INFORMATION,
                (user_w.as_ptr(), password_ptr),
            )
        };
        if hr == SCHED_E_ACCOUNT_INFORMATION_NOT_SET {
            warn!("job created, but the account information was rejected");
            return Ok(false);
        }
        hr.check(task::SET_ACCOUNT_INFORMATION.name())?;
        debug!(clear, "account set");
        Ok(true)
    }

    /// Account the job runs as, or `None` when none is set, the service has
    /// no security services, or it answers with a null string.
    pub fn account(&self) -> WtsResult<Option<String>> {
        let job = self.job()?;
        let (hr, raw) = unsafe { job.invoke_out(task::GET_ACCOUNT_INFORMATION) };
        let user = unsafe { RemoteMemory::new(raw, self.runtime()) };
        if hr == SCHED_E_ACCOUNT_INFORMATION_NOT_SET || hr == SCHED_E_NO_SECURITY_SERVICES {
            return Ok(None);
        }
        hr.check(task::GET_ACCOUNT_INFORMATION.name())?;
        if user.is_null() {
            return Ok(None);
        }
        Ok(Some(user.read_string(self.max_name_len())))
    }

    // ═══════════════════════════════════════════════════════════════
    // Run statistics
    // ═══════════════════════════════════════════════════════════════

    pub fn status(&self) -> WtsResult<JobStatus> {
        let job = self.job()?;
        let (hr, status) = unsafe { job.invoke_out(task::GET_STATUS) };
        hr.check(task::GET_STATUS.name())?;
        Ok(JobStatus::from_status(HResult(status)))
    }

    /// Exit code of the last completed run.
    pub fn exit_code(&self) -> WtsResult<u32> {
        self.get_u32(task::GET_EXIT_CODE)
    }

    /// Next scheduled start, `None` when nothing is scheduled.
    pub fn next_run_time(&self) -> WtsResult<Option<NaiveDateTime>> {
        let job = self.job()?;
        let (hr, st): (HResult, SystemTime) = unsafe { job.invoke_out(task::GET_NEXT_RUN_TIME) };
        hr.check(task::GET_NEXT_RUN_TIME.name())?;
        from_system_time(&st)
    }

    /// Last start, `None` when the job has never run.
    pub fn most_recent_run_time(&self) -> WtsResult<Option<NaiveDateTime>> {
        let job = self.job()?;
        let (hr, st): (HResult, SystemTime) =
            unsafe { job.invoke_out(task::GET_MOST_RECENT_RUN_TIME) };
        if hr == SCHED_S_TASK_HAS_NOT_RUN {
            return Ok(None);
        }
        hr.check(task::GET_MOST_RECENT_RUN_TIME.name())?;
        from_system_time(&st)
    }

    // ═══════════════════════════════════════════════════════════════
    // Triggers
    // ═══════════════════════════════════════════════════════════════

    pub fn trigger_count(&self) -> WtsResult<u16> {
        let job = self.job()?;
        let (hr, count) = unsafe { job.invoke_out(task::GET_TRIGGER_COUNT) };
        hr.check(task::GET_TRIGGER_COUNT.name())?;
        Ok(count)
    }

    /// Human-readable description of trigger `index`.
    pub fn trigger_string(&self, index: u16) -> WtsResult<String> {
        let job = self.job()?;
        let mut raw: *mut u16 = ptr::null_mut();
        let hr = unsafe { job.invoke(task::GET_TRIGGER_STRING, (index, &mut raw as PPWSTR)) };
        let text = unsafe { RemoteMemory::new(raw, self.runtime()) };
        hr.check(task::GET_TRIGGER_STRING.name())?;
        Ok(text.read_string(self.max_name_len()))
    }

    pub fn delete_trigger(&mut self, index: u16) -> WtsResult<()> {
        let job = self.job()?;
        unsafe { job.invoke(task::DELETE_TRIGGER, (index,)) }
            .check(task::DELETE_TRIGGER.name())?;
        debug!(index, "trigger deleted");
        Ok(())
    }

    fn fetch_trigger(&self, index: u16) -> WtsResult<ComPtr<ITaskTrigger>> {
        let job = self.job()?;
        let mut raw: *mut c_void = ptr::null_mut();
        let hr = unsafe { job.invoke(task::GET_TRIGGER, (index, &mut raw as PPUnknown)) };
        unsafe { ComPtr::from_out(hr, raw, task::GET_TRIGGER.name()) }
    }

    /// Reads trigger `index`.
    pub fn trigger(&self, index: u16) -> WtsResult<Trigger> {
        let trigger = self.fetch_trigger(index)?;
        let mut buffer = codec::request_buffer();
        unsafe {
            trigger.invoke(
                task_trigger::GET_TRIGGER,
                (&mut buffer as *mut TriggerBuffer,),
            )
        }
        .check(task_trigger::GET_TRIGGER.name())?;
        codec::decode(&buffer)
    }

    /// Appends `trigger` and returns its index.
    pub fn set_trigger(&mut self, trigger: &Trigger) -> WtsResult<u16> {
        self.create_trigger(&codec::encode(trigger))
    }

    /// Overwrites the existing trigger at `index` with `trigger`.
    pub fn add_trigger(&mut self, index: u16, trigger: &Trigger) -> WtsResult<()> {
        let buffer = codec::encode(trigger);
        let handle = self.fetch_trigger(index)?;
        write_trigger(&handle, &buffer)?;
        debug!(index, kind = trigger.kind().as_str(), "trigger replaced");
        Ok(())
    }
}
