//! Scheduler facade
//!
//! [`TaskScheduler`] owns the runtime session, the scheduler root and at
//! most one bound job. Scheduler-level operations live here; per-job
//! operations are in [`crate::job`].
//!
//! # Threading
//!
//! The facade holds raw component pointers and is therefore neither `Send`
//! nor `Sync`: it must be used from the thread that created it.

use crate::com::guid::Guid;
use crate::com::interfaces::{
    CLSID_CTASK, IEnumWorkItems, ITask, ITaskScheduler, ITaskTrigger, PCWSTR, PPUnknown, PPWSTR,
    enum_work_items, scheduler, task, task_trigger,
};
use crate::com::{ComPtr, Interface};
use crate::config::SchedulerConfig;
use crate::error::{WtsError, WtsResult};
use crate::runtime::{ComRuntime, Session};
use crate::trigger::Trigger;
use crate::trigger::codec::{self, TriggerBuffer};
use crate::wide::{RemoteMemory, take_remote_string, to_wide};
use std::ffi::c_void;
use std::fs;
use std::io::ErrorKind;
use std::ptr;
use tracing::{debug, info, instrument};

const NO_SCHEDULER: &str = "no current task scheduler";

/// File suffix the service gives stored jobs.
pub const JOB_SUFFIX: &str = ".job";

/// Client for the Task Scheduler 1.0 service.
pub struct TaskScheduler {
    // Fields drop in declaration order: job, root, then the session.
    pub(crate) job: Option<ComPtr<ITask>>,
    pub(crate) root: Option<ComPtr<ITaskScheduler>>,
    pub(crate) session: Session,
    pub(crate) config: SchedulerConfig,
}

impl TaskScheduler {
    /// Connects to the local service with default configuration.
    #[cfg(windows)]
    pub fn new() -> WtsResult<Self> {
        Self::with_config(SchedulerConfig::default())
    }

    #[cfg(windows)]
    pub fn with_config(config: SchedulerConfig) -> WtsResult<Self> {
        Self::open(Session::system()?, config)
    }

    /// Opens a session over `runtime` and connects through it.
    pub fn with_runtime(
        runtime: impl ComRuntime + 'static,
        config: SchedulerConfig,
    ) -> WtsResult<Self> {
        Self::open(Session::open(runtime)?, config)
    }

    /// 세션으로부터 스케줄러 생성
    #[instrument(skip_all)]
    pub fn open(session: Session, config: SchedulerConfig) -> WtsResult<Self> {
        config.validate()?;
        let root = session.create_scheduler()?;

        let scheduler = Self {
            job: None,
            root: Some(root),
            session,
            config,
        };
        scheduler.apply_target_host()?;

        info!(target_host = ?scheduler.config.target_host, "task scheduler opened");
        Ok(scheduler)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Whether a job is currently bound.
    pub fn is_bound(&self) -> bool {
        self.job.is_some()
    }

    pub(crate) fn root(&self) -> WtsResult<&ComPtr<ITaskScheduler>> {
        self.root
            .as_ref()
            .ok_or(WtsError::ResourceUnavailable(NO_SCHEDULER))
    }

    pub(crate) fn max_name_len(&self) -> usize {
        self.config.max_name_len
    }

    pub(crate) fn runtime(&self) -> &dyn ComRuntime {
        self.session.runtime()
    }

    /// Names of every stored job, in service order (`"name.job"`).
    pub fn enumerate(&self) -> WtsResult<Vec<String>> {
        let root = self.root()?;
        let (hr, raw) = unsafe { root.invoke_out(scheduler::ENUM) };
        let items = unsafe { ComPtr::<IEnumWorkItems>::from_out(hr, raw, scheduler::ENUM.name()) }?;

        let runtime = self.runtime();
        let batch_size = self.config.enum_batch_size;
        let mut names = Vec::new();

        loop {
            let mut array: PPWSTR = ptr::null_mut();
            let mut fetched: u32 = 0;
            let hr = unsafe {
                items.invoke(
                    enum_work_items::NEXT,
                    (batch_size, &mut array as *mut PPWSTR, &mut fetched as *mut u32),
                )
            };
            let array = unsafe { RemoteMemory::new(array, runtime) };
            hr.check(enum_work_items::NEXT.name())?;

            if fetched == 0 || array.is_null() {
                break;
            }
            for i in 0..fetched.min(batch_size) as usize {
                let name = unsafe { *array.as_ptr().add(i) };
                names.push(unsafe { take_remote_string(runtime, name, self.max_name_len()) });
            }
        }

        debug!(count = names.len(), "enumerated jobs");
        Ok(names)
    }

    /// Binds the stored job `name`, releasing any previously bound job.
    ///
    /// On failure the previous binding is kept.
    #[instrument(skip(self))]
    pub fn activate(&mut self, name: &str) -> WtsResult<()> {
        let root = self.root()?;
        let wide = to_wide(name);
        let iid = ITask::IID;
        let mut raw: *mut c_void = ptr::null_mut();
        let hr = unsafe {
            root.invoke(
                scheduler::ACTIVATE,
                (wide.as_ptr(), &iid as *const Guid, &mut raw as PPUnknown),
            )
        };
        let job = unsafe { ComPtr::<ITask>::from_out(hr, raw, scheduler::ACTIVATE.name()) }?;

        self.job = Some(job);
        debug!("job activated");
        Ok(())
    }

    /// Deletes the stored job `name`.
    #[instrument(skip(self))]
    pub fn delete(&self, name: &str) -> WtsResult<()> {
        let root = self.root()?;
        let wide = to_wide(name);
        unsafe { root.invoke(scheduler::DELETE, (wide.as_ptr(),)) }
            .check(scheduler::DELETE.name())?;
        debug!("job deleted");
        Ok(())
    }

    /// Creates a new work item called `name` and binds it.
    ///
    /// Fails with [`WtsError::AlreadyExists`] when a stored job with the
    /// same name exists (case-insensitive); the service is not asked to
    /// create anything in that case. The new job is not stored until
    /// [`TaskScheduler::save`] is called.
    #[instrument(skip(self, trigger), fields(with_trigger = trigger.is_some()))]
    pub fn new_job(&mut self, name: &str, trigger: Option<&Trigger>) -> WtsResult<()> {
        self.root()?;
        if name.is_empty() {
            return Err(WtsError::InvalidArgument("job name is empty".to_string()));
        }
        let buffer = trigger.map(codec::encode);

        let file_name = format!("{name}{JOB_SUFFIX}").to_lowercase();
        if self
            .enumerate()?
            .iter()
            .any(|existing| existing.to_lowercase() == file_name)
        {
            return Err(WtsError::AlreadyExists(name.to_string()));
        }

        self.job = None;

        let root = self.root()?;
        let wide = to_wide(name);
        let clsid = CLSID_CTASK;
        let iid = ITask::IID;
        let mut raw: *mut c_void = ptr::null_mut();
        let hr = unsafe {
            root.invoke(
                scheduler::NEW_WORK_ITEM,
                (
                    wide.as_ptr(),
                    &clsid as *const Guid,
                    &iid as *const Guid,
                    &mut raw as PPUnknown,
                ),
            )
        };
        let job = unsafe { ComPtr::<ITask>::from_out(hr, raw, scheduler::NEW_WORK_ITEM.name()) }?;
        self.job = Some(job);

        if let Some(buffer) = buffer {
            self.create_trigger(&buffer)?;
        }
        info!("job created");
        Ok(())
    }

    /// Targets the service on `host` (empty for the local machine).
    ///
    /// The host is remembered and re-applied whenever the root is recreated.
    /// A host the service rejects is not remembered.
    #[instrument(skip(self))]
    pub fn set_target_host(&mut self, host: &str) -> WtsResult<()> {
        let host = (!host.is_empty()).then(|| host.to_string());
        self.send_target_host(host.as_deref())?;
        self.config.target_host = host;
        Ok(())
    }

    /// Re-targets a fresh root at the remembered host, if any.
    pub(crate) fn apply_target_host(&self) -> WtsResult<()> {
        match self.config.target_host.as_deref() {
            Some(host) => self.send_target_host(Some(host)),
            None => Ok(()),
        }
    }

    /// `SetTargetComputer`; `None` (null) means the local machine.
    fn send_target_host(&self, host: Option<&str>) -> WtsResult<()> {
        let root = self.root()?;
        let wide = host.map(to_wide);
        let host_ptr: PCWSTR = wide.as_ref().map_or(ptr::null(), |w| w.as_ptr());
        unsafe { root.invoke(scheduler::SET_TARGET_COMPUTER, (host_ptr,)) }
            .check(scheduler::SET_TARGET_COMPUTER.name())?;
        Ok(())
    }

    /// Host the root currently targets, as reported by the service.
    pub fn target_host(&self) -> WtsResult<String> {
        let root = self.root()?;
        let (hr, raw) = unsafe { root.invoke_out(scheduler::GET_TARGET_COMPUTER) };
        let host = unsafe { RemoteMemory::new(raw, self.runtime()) };
        hr.check(scheduler::GET_TARGET_COMPUTER.name())?;
        Ok(host.read_string(self.max_name_len()))
    }

    /// Whether `name` is stored in the job directory.
    ///
    /// Scans [`SchedulerConfig::job_store_dir`] for a file whose name,
    /// without its `.job` suffix, equals `name` (ignoring case). Needs
    /// neither a root nor a bound job. A missing directory means `false`.
    pub fn exists(&self, name: &str) -> WtsResult<bool> {
        let entries = match fs::read_dir(&self.config.job_store_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let file_name = entry?.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let base = strip_job_suffix(file_name);
            if base.to_lowercase() == name.to_lowercase() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `ITask::CreateTrigger` followed by `ITaskTrigger::SetTrigger`.
    ///
    /// Returns the index the service assigned.
    pub(crate) fn create_trigger(&self, buffer: &TriggerBuffer) -> WtsResult<u16> {
        let job = self.job()?;
        let mut index: u16 = 0;
        let mut raw: *mut c_void = ptr::null_mut();
        let hr = unsafe {
            job.invoke(
                task::CREATE_TRIGGER,
                (&mut index as *mut u16, &mut raw as PPUnknown),
            )
        };
        let trigger =
            unsafe { ComPtr::<ITaskTrigger>::from_out(hr, raw, task::CREATE_TRIGGER.name()) }?;
        write_trigger(&trigger, buffer)?;
        debug!(index, "trigger created");
        Ok(index)
    }

    pub(crate) fn job(&self) -> WtsResult<&ComPtr<ITask>> {
        self.job
            .as_ref()
            .ok_or(WtsError::ResourceUnavailable(crate::job::NO_JOB))
    }
}

/// `ITaskTrigger::SetTrigger`
pub(crate) fn write_trigger(trigger: &ComPtr<ITaskTrigger>, buffer: &TriggerBuffer) -> WtsResult<()> {
    unsafe { trigger.invoke(task_trigger::SET_TRIGGER, (buffer as *const TriggerBuffer,)) }
        .check(task_trigger::SET_TRIGGER.name())?;
    Ok(())
}

/// Strips a trailing `.job` (any case).
pub(crate) fn strip_job_suffix(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(JOB_SUFFIX.len());
    match (file_name.get(..split), file_name.get(split..)) {
        (Some(base), Some(suffix)) if suffix.eq_ignore_ascii_case(JOB_SUFFIX) => base,
        _ => file_name,
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("job", &self.job)
            .field("root", &self.root)
            .field("session", &self.session)
            .field("config", &self.config)
            .finish()
    }
}
