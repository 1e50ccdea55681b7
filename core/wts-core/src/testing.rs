//! In-process fake Task Scheduler service for facade tests.
//!
//! Every fake object is a heap block whose first field points at its own
//! method table, so it is dispatched exactly like a real component object.
//! Shared state lives in [`World`]; [`Harness`] wires it to a
//! [`FakeRuntime`] and hands out connected [`TaskScheduler`]s.

use crate::com::dispatch::{RawHResult, This};
use crate::com::guid::Guid;
use crate::com::hresult::{
    E_FILE_EXISTS, E_FILE_NOT_FOUND, E_INVALIDARG, E_NOINTERFACE, E_NOTIMPL, E_POINTER, HResult,
    S_FALSE, S_OK, SCHED_E_ACCOUNT_INFORMATION_NOT_SET, SCHED_E_TASK_NOT_RUNNING,
    SCHED_E_TRIGGER_NOT_FOUND, SCHED_S_TASK_HAS_NOT_RUN, SCHED_S_TASK_READY, SCHED_S_TASK_RUNNING,
};
use crate::com::interfaces::{
    CLSID_CTASK, IEnumWorkItems, IPersistFile, ITask, ITaskScheduler, ITaskTrigger, IUnknown,
    PCWSTR, PPUnknown, PPWSTR,
};
use crate::com::{ComPtr, Interface};
use crate::config::SchedulerConfig;
use crate::error::WtsResult;
use crate::runtime::ComRuntime;
use crate::scheduler::{JOB_SUFFIX, TaskScheduler, strip_job_suffix};
use crate::time::SystemTime;
use crate::trigger::codec::{TRIGGER_SIZE, TriggerBuffer, request_buffer};
use crate::wide::wide_to_string;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::ffi::c_void;
use std::ptr;
use std::rc::Rc;

const DEFAULT_MAX_RUN_MS: u32 = 72 * 60 * 60_000;

/// State of one job known to the fake service.
#[derive(Debug, Clone)]
pub(crate) struct JobState {
    pub name: String,
    pub application: String,
    pub parameters: String,
    pub working_directory: String,
    pub comment: String,
    pub creator: String,
    pub account: Option<String>,
    pub password: Option<String>,
    /// Answer `GetAccountInformation` with success and a null string.
    pub null_account: bool,
    pub priority: u32,
    pub flags: u32,
    pub max_run_ms: u32,
    pub status: HResult,
    pub exit_code: u32,
    pub triggers: Vec<TriggerBuffer>,
    pub next_run: SystemTime,
    pub last_run: Option<SystemTime>,
    pub runs: u32,
    pub saved_to: Vec<Option<String>>,
}

impl JobState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            application: String::new(),
            parameters: String::new(),
            working_directory: String::new(),
            comment: String::new(),
            creator: String::new(),
            account: None,
            password: None,
            null_account: false,
            priority: 0x20,
            flags: 0,
            max_run_ms: DEFAULT_MAX_RUN_MS,
            status: SCHED_S_TASK_READY,
            exit_code: 0,
            triggers: Vec::new(),
            next_run: [0; 8],
            last_run: None,
            runs: 0,
            saved_to: Vec::new(),
        }
    }
}

fn job_key(name: &str) -> String {
    strip_job_suffix(name).to_lowercase()
}

/// Everything the fake service knows and everything it observed.
#[derive(Debug, Default)]
pub(crate) struct World {
    /// Stored job file names, in enumeration order.
    pub names: Vec<String>,
    pub jobs: BTreeMap<String, JobState>,
    pub target_host: Option<String>,
    /// Methods forced to fail, keyed by qualified name.
    pub failures: HashMap<&'static str, HResult>,
    /// Every method invoked, in order.
    pub calls: Vec<&'static str>,
    /// `fetched` count of each `IEnumWorkItems::Next` call.
    pub batches: Vec<u32>,
    /// Live objects per interface.
    pub live: HashMap<&'static str, i32>,
    pub allocations: u32,
    pub frees: u32,
    pub inits: u32,
    pub shutdowns: u32,
    pub fail_init: bool,
}

impl World {
    fn enter(&mut self, method: &'static str) -> Option<RawHResult> {
        self.calls.push(method);
        self.failures.get(method).map(|hr| hr.0)
    }

    fn job(&mut self, key: &str) -> &mut JobState {
        self.jobs
            .get_mut(key)
            .unwrap_or_else(|| panic!("fake job '{key}' vanished"))
    }

    fn alloc_string(&mut self, s: &str) -> *mut u16 {
        let units: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
        let block = unsafe { libc::malloc(units.len() * size_of::<u16>()) } as *mut u16;
        assert!(!block.is_null());
        unsafe { ptr::copy_nonoverlapping(units.as_ptr(), block, units.len()) };
        self.allocations += 1;
        block
    }

    fn alloc_array(&mut self, items: &[*mut u16]) -> *mut *mut u16 {
        let block =
            unsafe { libc::malloc(items.len().max(1) * size_of::<*mut u16>()) } as *mut *mut u16;
        assert!(!block.is_null());
        unsafe { ptr::copy_nonoverlapping(items.as_ptr(), block, items.len()) };
        self.allocations += 1;
        block
    }
}

type Shared = Rc<RefCell<World>>;

// ═══════════════════════════════════════════════════════════════
// Object model
// ═══════════════════════════════════════════════════════════════

#[repr(C)]
struct FakeObject {
    table: *const *const c_void,
    methods: Vec<*const c_void>,
    refs: Cell<u32>,
    interface: &'static str,
    iid: Guid,
    world: Shared,
    job: String,
    trigger: u16,
    cursor: Cell<usize>,
}

fn spawn<I: Interface>(world: &Shared, methods: Vec<*const c_void>, job: &str, trigger: u16) -> *mut c_void {
    assert_eq!(methods.len(), I::SLOT_COUNT);
    let mut object = Box::new(FakeObject {
        table: ptr::null(),
        methods,
        refs: Cell::new(1),
        interface: I::NAME,
        iid: I::IID,
        world: world.clone(),
        job: job.to_string(),
        trigger,
        cursor: Cell::new(0),
    });
    object.table = object.methods.as_ptr();
    *world.borrow_mut().live.entry(I::NAME).or_default() += 1;
    Box::into_raw(object) as *mut c_void
}

unsafe fn this<'a>(this: This) -> &'a FakeObject {
    unsafe { &*(this as *const FakeObject) }
}

/// Method table for `I` with the `IUnknown` slots filled in and `entries`
/// placed at their indices; everything else answers `E_NOTIMPL`.
fn table<I: Interface>(entries: &[(usize, *const c_void)]) -> Vec<*const c_void> {
    let mut methods = vec![not_implemented as *const c_void; I::SLOT_COUNT];
    methods[0] = query_interface as *const c_void;
    methods[1] = add_ref as *const c_void;
    methods[2] = release as *const c_void;
    for (index, method) in entries {
        methods[*index] = *method;
    }
    methods
}

unsafe extern "system" fn not_implemented(_this: This) -> RawHResult {
    E_NOTIMPL.0
}

unsafe extern "system" fn query_interface(
    this_ptr: This,
    iid: *const Guid,
    out: PPUnknown,
) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    if out.is_null() {
        return E_POINTER.0;
    }
    let iid = unsafe { *iid };
    if let Some(hr) = object.world.borrow_mut().enter("IUnknown::QueryInterface") {
        unsafe { *out = ptr::null_mut() };
        return hr;
    }
    if iid == object.iid || iid == IUnknown::IID {
        object.refs.set(object.refs.get() + 1);
        unsafe { *out = this_ptr };
        return S_OK.0;
    }
    if object.iid == ITask::IID && iid == IPersistFile::IID {
        let persist = spawn::<IPersistFile>(&object.world, persist_table(), &object.job, 0);
        unsafe { *out = persist };
        return S_OK.0;
    }
    unsafe { *out = ptr::null_mut() };
    E_NOINTERFACE.0
}

unsafe extern "system" fn add_ref(this_ptr: This) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    object.refs.set(object.refs.get() + 1);
    object.refs.get() as RawHResult
}

unsafe extern "system" fn release(this_ptr: This) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    let refs = object.refs.get() - 1;
    object.refs.set(refs);
    if refs == 0 {
        *object.world.borrow_mut().live.entry(object.interface).or_default() -= 1;
        drop(unsafe { Box::from_raw(this_ptr as *mut FakeObject) });
    }
    refs as RawHResult
}

unsafe fn read_wide(ptr: PCWSTR) -> Option<String> {
    (!ptr.is_null()).then(|| unsafe { wide_to_string(ptr, usize::MAX) })
}

// ═══════════════════════════════════════════════════════════════
// ITaskScheduler
// ═══════════════════════════════════════════════════════════════

fn scheduler_table() -> Vec<*const c_void> {
    table::<ITaskScheduler>(&[
        (3, set_target_computer as *const c_void),
        (4, get_target_computer as *const c_void),
        (5, enum_items as *const c_void),
        (6, activate as *const c_void),
        (7, delete as *const c_void),
        (8, new_work_item as *const c_void),
    ])
}

unsafe extern "system" fn set_target_computer(this_ptr: This, host: PCWSTR) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    let mut world = object.world.borrow_mut();
    if let Some(hr) = world.enter("ITaskScheduler::SetTargetComputer") {
        return hr;
    }
    world.target_host = unsafe { read_wide(host) };
    S_OK.0
}

unsafe extern "system" fn get_target_computer(this_ptr: This, out: PPWSTR) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    let mut world = object.world.borrow_mut();
    if let Some(hr) = world.enter("ITaskScheduler::GetTargetComputer") {
        return hr;
    }
    let host = world.target_host.clone().unwrap_or_else(|| "LOCALHOST".to_string());
    let host = format!(r"\\{}", host.trim_start_matches('\\'));
    unsafe { *out = world.alloc_string(&host) };
    S_OK.0
}

unsafe extern "system" fn enum_items(this_ptr: This, out: PPUnknown) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    if let Some(hr) = object.world.borrow_mut().enter("ITaskScheduler::Enum") {
        return hr;
    }
    let methods = table::<IEnumWorkItems>(&[(3, next as *const c_void)]);
    unsafe { *out = spawn::<IEnumWorkItems>(&object.world, methods, "", 0) };
    S_OK.0
}

unsafe extern "system" fn activate(
    this_ptr: This,
    name: PCWSTR,
    iid: *const Guid,
    out: PPUnknown,
) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    unsafe { *out = ptr::null_mut() };
    let key = {
        let mut world = object.world.borrow_mut();
        if let Some(hr) = world.enter("ITaskScheduler::Activate") {
            return hr;
        }
        if unsafe { *iid } != ITask::IID {
            return E_NOINTERFACE.0;
        }
        let key = job_key(&unsafe { read_wide(name) }.unwrap_or_default());
        let stored = world.names.iter().any(|n| job_key(n) == key);
        if !stored || !world.jobs.contains_key(&key) {
            return E_FILE_NOT_FOUND.0;
        }
        key
    };
    unsafe { *out = spawn::<ITask>(&object.world, task_table(), &key, 0) };
    S_OK.0
}

unsafe extern "system" fn delete(this_ptr: This, name: PCWSTR) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    let mut world = object.world.borrow_mut();
    if let Some(hr) = world.enter("ITaskScheduler::Delete") {
        return hr;
    }
    let key = job_key(&unsafe { read_wide(name) }.unwrap_or_default());
    let before = world.names.len();
    world.names.retain(|n| job_key(n) != key);
    if world.names.len() == before {
        return E_FILE_NOT_FOUND.0;
    }
    world.jobs.remove(&key);
    S_OK.0
}

unsafe extern "system" fn new_work_item(
    this_ptr: This,
    name: PCWSTR,
    clsid: *const Guid,
    iid: *const Guid,
    out: PPUnknown,
) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    unsafe { *out = ptr::null_mut() };
    let key = {
        let mut world = object.world.borrow_mut();
        if let Some(hr) = world.enter("ITaskScheduler::NewWorkItem") {
            return hr;
        }
        if unsafe { *clsid } != CLSID_CTASK || unsafe { *iid } != ITask::IID {
            return E_INVALIDARG.0;
        }
        let name = unsafe { read_wide(name) }.unwrap_or_default();
        let key = job_key(&name);
        if world.names.iter().any(|n| job_key(n) == key) {
            return E_FILE_EXISTS.0;
        }
        world.jobs.insert(key.clone(), JobState::new(&name));
        key
    };
    unsafe { *out = spawn::<ITask>(&object.world, task_table(), &key, 0) };
    S_OK.0
}

// ═══════════════════════════════════════════════════════════════
// IEnumWorkItems
// ═══════════════════════════════════════════════════════════════

unsafe extern "system" fn next(
    this_ptr: This,
    celt: u32,
    names: *mut PPWSTR,
    fetched: *mut u32,
) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    let mut world = object.world.borrow_mut();
    unsafe {
        *names = ptr::null_mut();
        *fetched = 0;
    }
    if let Some(hr) = world.enter("IEnumWorkItems::Next") {
        return hr;
    }

    let start = object.cursor.get().min(world.names.len());
    let end = (start + celt as usize).min(world.names.len());
    object.cursor.set(end);
    let batch: Vec<String> = world.names[start..end].to_vec();
    world.batches.push(batch.len() as u32);
    if batch.is_empty() {
        return S_FALSE.0;
    }

    let strings: Vec<*mut u16> = batch.iter().map(|n| world.alloc_string(n)).collect();
    unsafe {
        *names = world.alloc_array(&strings);
        *fetched = strings.len() as u32;
    }
    if strings.len() == celt as usize { S_OK.0 } else { S_FALSE.0 }
}

// ═══════════════════════════════════════════════════════════════
// ITask
// ═══════════════════════════════════════════════════════════════

fn task_table() -> Vec<*const c_void> {
    table::<ITask>(&[
        (3, create_trigger as *const c_void),
        (4, delete_trigger as *const c_void),
        (5, get_trigger_count as *const c_void),
        (6, get_trigger as *const c_void),
        (7, get_trigger_string as *const c_void),
        (9, get_next_run_time as *const c_void),
        (12, run as *const c_void),
        (13, terminate as *const c_void),
        (15, get_most_recent_run_time as *const c_void),
        (16, get_status as *const c_void),
        (17, get_exit_code as *const c_void),
        (18, set_comment as *const c_void),
        (19, get_comment as *const c_void),
        (20, set_creator as *const c_void),
        (21, get_creator as *const c_void),
        (28, set_flags as *const c_void),
        (29, get_flags as *const c_void),
        (30, set_account_information as *const c_void),
        (31, get_account_information as *const c_void),
        (32, set_application_name as *const c_void),
        (33, get_application_name as *const c_void),
        (34, set_parameters as *const c_void),
        (35, get_parameters as *const c_void),
        (36, set_working_directory as *const c_void),
        (37, get_working_directory as *const c_void),
        (38, set_priority as *const c_void),
        (39, get_priority as *const c_void),
        (42, set_max_run_time as *const c_void),
        (43, get_max_run_time as *const c_void),
    ])
}

/// Runs `f` against the job behind `this_ptr` unless `method` is forced to fail.
unsafe fn with_job(
    this_ptr: This,
    method: &'static str,
    f: impl FnOnce(&mut World, &str) -> RawHResult,
) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    let mut world = object.world.borrow_mut();
    if let Some(hr) = world.enter(method) {
        return hr;
    }
    f(&mut world, &object.job)
}

macro_rules! string_property {
    ($get:ident, $set:ident, $field:ident, $get_name:literal, $set_name:literal) => {
        unsafe extern "system" fn $get(this_ptr: This, out: PPWSTR) -> RawHResult {
            unsafe { *out = ptr::null_mut() };
            unsafe {
                with_job(this_ptr, $get_name, |world, key| {
                    let value = world.job(key).$field.clone();
                    *out = world.alloc_string(&value);
                    S_OK.0
                })
            }
        }

        unsafe extern "system" fn $set(this_ptr: This, value: PCWSTR) -> RawHResult {
            let Some(value) = (unsafe { read_wide(value) }) else {
                return E_INVALIDARG.0;
            };
            unsafe {
                with_job(this_ptr, $set_name, |world, key| {
                    world.job(key).$field = value;
                    S_OK.0
                })
            }
        }
    };
}

macro_rules! u32_property {
    ($get:ident, $set:ident, $field:ident, $get_name:literal, $set_name:literal) => {
        unsafe extern "system" fn $get(this_ptr: This, out: *mut u32) -> RawHResult {
            unsafe {
                with_job(this_ptr, $get_name, |world, key| {
                    *out = world.job(key).$field;
                    S_OK.0
                })
            }
        }

        unsafe extern "system" fn $set(this_ptr: This, value: u32) -> RawHResult {
            unsafe {
                with_job(this_ptr, $set_name, |world, key| {
                    world.job(key).$field = value;
                    S_OK.0
                })
            }
        }
    };
}

string_property!(get_comment, set_comment, comment, "ITask::GetComment", "ITask::SetComment");
string_property!(get_creator, set_creator, creator, "ITask::GetCreator", "ITask::SetCreator");
string_property!(
    get_application_name,
    set_application_name,
    application,
    "ITask::GetApplicationName",
    "ITask::SetApplicationName"
);
string_property!(
    get_parameters,
    set_parameters,
    parameters,
    "ITask::GetParameters",
    "ITask::SetParameters"
);
string_property!(
    get_working_directory,
    set_working_directory,
    working_directory,
    "ITask::GetWorkingDirectory",
    "ITask::SetWorkingDirectory"
);
u32_property!(get_flags, set_flags, flags, "ITask::GetFlags", "ITask::SetFlags");
u32_property!(get_priority, set_priority, priority, "ITask::GetPriority", "ITask::SetPriority");
u32_property!(
    get_max_run_time,
    set_max_run_time,
    max_run_ms,
    "ITask::GetMaxRunTime",
    "ITask::SetMaxRunTime"
);

unsafe extern "system" fn run(this_ptr: This) -> RawHResult {
    unsafe {
        with_job(this_ptr, "ITask::Run", |world, key| {
            let job = world.job(key);
            job.runs += 1;
            job.status = SCHED_S_TASK_RUNNING;
            S_OK.0
        })
    }
}

unsafe extern "system" fn terminate(this_ptr: This) -> RawHResult {
    unsafe {
        with_job(this_ptr, "ITask::Terminate", |world, key| {
            let job = world.job(key);
            if job.status != SCHED_S_TASK_RUNNING {
                return SCHED_E_TASK_NOT_RUNNING.0;
            }
            job.status = SCHED_S_TASK_READY;
            S_OK.0
        })
    }
}

unsafe extern "system" fn get_status(this_ptr: This, out: *mut i32) -> RawHResult {
    unsafe {
        with_job(this_ptr, "ITask::GetStatus", |world, key| {
            *out = world.job(key).status.0;
            S_OK.0
        })
    }
}

unsafe extern "system" fn get_exit_code(this_ptr: This, out: *mut u32) -> RawHResult {
    unsafe {
        with_job(this_ptr, "ITask::GetExitCode", |world, key| {
            let job = world.job(key);
            *out = job.exit_code;
            if job.last_run.is_none() {
                SCHED_S_TASK_HAS_NOT_RUN.0
            } else {
                S_OK.0
            }
        })
    }
}

unsafe extern "system" fn get_next_run_time(this_ptr: This, out: *mut SystemTime) -> RawHResult {
    unsafe {
        with_job(this_ptr, "ITask::GetNextRunTime", |world, key| {
            *out = world.job(key).next_run;
            S_OK.0
        })
    }
}

unsafe extern "system" fn get_most_recent_run_time(
    this_ptr: This,
    out: *mut SystemTime,
) -> RawHResult {
    unsafe {
        with_job(this_ptr, "ITask::GetMostRecentRunTime", |world, key| {
            match world.job(key).last_run {
                Some(st) => {
                    *out = st;
                    S_OK.0
                }
                None => {
                    *out = [0; 8];
                    SCHED_S_TASK_HAS_NOT_RUN.0
                }
            }
        })
    }
}

unsafe extern "system" fn set_account_information(
    this_ptr: This,
    user: PCWSTR,
    password: PCWSTR,
) -> RawHResult {
    let Some(user) = (unsafe { read_wide(user) }) else {
        return E_INVALIDARG.0;
    };
    let password = unsafe { read_wide(password) };
    unsafe {
        with_job(this_ptr, "ITask::SetAccountInformation", |world, key| {
            let job = world.job(key);
            job.account = Some(user);
            job.password = password;
            S_OK.0
        })
    }
}

unsafe extern "system" fn get_account_information(this_ptr: This, out: PPWSTR) -> RawHResult {
    unsafe { *out = ptr::null_mut() };
    unsafe {
        with_job(this_ptr, "ITask::GetAccountInformation", |world, key| {
            if world.job(key).null_account {
                return S_OK.0;
            }
            match world.job(key).account.clone() {
                Some(user) => {
                    *out = world.alloc_string(&user);
                    S_OK.0
                }
                None => SCHED_E_ACCOUNT_INFORMATION_NOT_SET.0,
            }
        })
    }
}

fn trigger_table() -> Vec<*const c_void> {
    table::<ITaskTrigger>(&[
        (3, trigger_set as *const c_void),
        (4, trigger_get as *const c_void),
        (5, trigger_describe as *const c_void),
    ])
}

unsafe extern "system" fn create_trigger(
    this_ptr: This,
    index: *mut u16,
    out: PPUnknown,
) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    unsafe { *out = ptr::null_mut() };
    let created = unsafe {
        with_job(this_ptr, "ITask::CreateTrigger", |world, key| {
            let triggers = &mut world.job(key).triggers;
            triggers.push(request_buffer());
            *index = (triggers.len() - 1) as u16;
            S_OK.0
        })
    };
    if created != S_OK.0 {
        return created;
    }
    unsafe { *out = spawn::<ITaskTrigger>(&object.world, trigger_table(), &object.job, *index) };
    S_OK.0
}

unsafe extern "system" fn get_trigger(this_ptr: This, index: u16, out: PPUnknown) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    unsafe { *out = ptr::null_mut() };
    let found = unsafe {
        with_job(this_ptr, "ITask::GetTrigger", |world, key| {
            if usize::from(index) < world.job(key).triggers.len() {
                S_OK.0
            } else {
                SCHED_E_TRIGGER_NOT_FOUND.0
            }
        })
    };
    if found != S_OK.0 {
        return found;
    }
    unsafe { *out = spawn::<ITaskTrigger>(&object.world, trigger_table(), &object.job, index) };
    S_OK.0
}

unsafe extern "system" fn delete_trigger(this_ptr: This, index: u16) -> RawHResult {
    unsafe {
        with_job(this_ptr, "ITask::DeleteTrigger", |world, key| {
            let triggers = &mut world.job(key).triggers;
            if usize::from(index) >= triggers.len() {
                return SCHED_E_TRIGGER_NOT_FOUND.0;
            }
            triggers.remove(usize::from(index));
            S_OK.0
        })
    }
}

unsafe extern "system" fn get_trigger_count(this_ptr: This, out: *mut u16) -> RawHResult {
    unsafe {
        with_job(this_ptr, "ITask::GetTriggerCount", |world, key| {
            *out = world.job(key).triggers.len() as u16;
            S_OK.0
        })
    }
}

fn describe(buffer: &TriggerBuffer) -> String {
    let kind = u32::from_le_bytes([buffer[32], buffer[33], buffer[34], buffer[35]]);
    let hour = u16::from_le_bytes([buffer[16], buffer[17]]);
    let minute = u16::from_le_bytes([buffer[18], buffer[19]]);
    format!("kind {kind} at {hour:02}:{minute:02}")
}

unsafe extern "system" fn get_trigger_string(this_ptr: This, index: u16, out: PPWSTR) -> RawHResult {
    unsafe { *out = ptr::null_mut() };
    unsafe {
        with_job(this_ptr, "ITask::GetTriggerString", |world, key| {
            let Some(buffer) = world.job(key).triggers.get(usize::from(index)).copied() else {
                return SCHED_E_TRIGGER_NOT_FOUND.0;
            };
            *out = world.alloc_string(&describe(&buffer));
            S_OK.0
        })
    }
}

// ═══════════════════════════════════════════════════════════════
// ITaskTrigger
// ═══════════════════════════════════════════════════════════════

unsafe fn with_trigger(
    this_ptr: This,
    method: &'static str,
    f: impl FnOnce(&mut TriggerBuffer) -> RawHResult,
) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    let index = usize::from(object.trigger);
    unsafe {
        with_job(this_ptr, method, |world, key| {
            match world.job(key).triggers.get_mut(index) {
                Some(buffer) => f(buffer),
                None => SCHED_E_TRIGGER_NOT_FOUND.0,
            }
        })
    }
}

unsafe extern "system" fn trigger_set(this_ptr: This, input: *const TriggerBuffer) -> RawHResult {
    let input = unsafe { *input };
    if usize::from(u16::from_le_bytes([input[0], input[1]])) != TRIGGER_SIZE {
        return E_INVALIDARG.0;
    }
    unsafe {
        with_trigger(this_ptr, "ITaskTrigger::SetTrigger", |buffer| {
            *buffer = input;
            S_OK.0
        })
    }
}

unsafe extern "system" fn trigger_get(this_ptr: This, out: *mut TriggerBuffer) -> RawHResult {
    let requested: TriggerBuffer = unsafe { *out };
    if usize::from(u16::from_le_bytes([requested[0], requested[1]])) != TRIGGER_SIZE {
        return E_INVALIDARG.0;
    }
    unsafe {
        with_trigger(this_ptr, "ITaskTrigger::GetTrigger", |buffer| {
            *out = *buffer;
            S_OK.0
        })
    }
}

unsafe extern "system" fn trigger_describe(this_ptr: This, out: PPWSTR) -> RawHResult {
    let object = unsafe { this(this_ptr) };
    unsafe { *out = ptr::null_mut() };
    let mut described = None;
    let hr = unsafe {
        with_trigger(this_ptr, "ITaskTrigger::GetTriggerString", |buffer| {
            described = Some(describe(buffer));
            S_OK.0
        })
    };
    if let Some(text) = described {
        unsafe { *out = object.world.borrow_mut().alloc_string(&text) };
    }
    hr
}

// ═══════════════════════════════════════════════════════════════
// IPersistFile
// ═══════════════════════════════════════════════════════════════

fn persist_table() -> Vec<*const c_void> {
    table::<IPersistFile>(&[(6, save as *const c_void)])
}

unsafe extern "system" fn save(this_ptr: This, file: PCWSTR, remember: i32) -> RawHResult {
    let file = unsafe { read_wide(file) };
    unsafe {
        with_job(this_ptr, "IPersistFile::Save", |world, key| {
            if remember != 1 {
                return E_INVALIDARG.0;
            }
            let job = world.job(key);
            job.saved_to.push(file);
            let stored = format!("{}{JOB_SUFFIX}", job.name);
            if !world.names.iter().any(|n| job_key(n) == job_key(&stored)) {
                world.names.push(stored);
            }
            S_OK.0
        })
    }
}

// ═══════════════════════════════════════════════════════════════
// Runtime and harness
// ═══════════════════════════════════════════════════════════════

/// [`ComRuntime`] over the fake service. Remote memory is `libc` heap.
pub(crate) struct FakeRuntime {
    world: Shared,
}

impl ComRuntime for FakeRuntime {
    fn initialize(&self) -> WtsResult<()> {
        let mut world = self.world.borrow_mut();
        if world.fail_init {
            return Err(crate::error::WtsError::RuntimeUnavailable(
                "fake runtime refused".to_string(),
            ));
        }
        world.inits += 1;
        Ok(())
    }

    fn shutdown(&self) {
        self.world.borrow_mut().shutdowns += 1;
    }

    fn create_scheduler(&self) -> WtsResult<ComPtr<ITaskScheduler>> {
        let raw = spawn::<ITaskScheduler>(&self.world, scheduler_table(), "", 0);
        Ok(unsafe { ComPtr::from_raw(raw) }.expect("fake scheduler is non-null"))
    }

    unsafe fn free_remote_memory(&self, ptr: *mut c_void) {
        if !ptr.is_null() {
            self.world.borrow_mut().frees += 1;
            unsafe { libc::free(ptr) };
        }
    }
}

pub(crate) struct Harness {
    pub world: Shared,
}

impl Harness {
    pub fn new() -> Self {
        crate::logging::init_test();
        Self {
            world: Rc::new(RefCell::new(World::default())),
        }
    }

    /// Harness with `names` already stored.
    pub fn with_jobs(names: &[&str]) -> Self {
        let harness = Self::new();
        {
            let mut world = harness.world.borrow_mut();
            for name in names {
                world.names.push(format!("{name}{JOB_SUFFIX}"));
                world.jobs.insert(job_key(name), JobState::new(name));
            }
        }
        harness
    }

    pub fn runtime(&self) -> FakeRuntime {
        FakeRuntime {
            world: self.world.clone(),
        }
    }

    pub fn scheduler(&self) -> TaskScheduler {
        self.scheduler_with(SchedulerConfig::default())
    }

    pub fn scheduler_with(&self, config: SchedulerConfig) -> TaskScheduler {
        TaskScheduler::with_runtime(self.runtime(), config).expect("fake scheduler opens")
    }

    pub fn fail(&self, method: &'static str, hr: HResult) {
        self.world.borrow_mut().failures.insert(method, hr);
    }

    pub fn heal(&self, method: &'static str) {
        self.world.borrow_mut().failures.remove(method);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.world
            .borrow()
            .calls
            .iter()
            .filter(|c| **c == method)
            .count()
    }

    pub fn job(&self, name: &str) -> JobState {
        self.world.borrow().jobs[&job_key(name)].clone()
    }

    pub fn update_job(&self, name: &str, f: impl FnOnce(&mut JobState)) {
        f(self.world.borrow_mut().job(&job_key(name)));
    }

    /// Live objects of `interface`.
    pub fn live(&self, interface: &str) -> i32 {
        self.world.borrow().live.get(interface).copied().unwrap_or(0)
    }

    pub fn live_total(&self) -> i32 {
        self.world.borrow().live.values().sum()
    }

    /// Remote blocks handed out but not yet freed.
    pub fn outstanding_memory(&self) -> i64 {
        let world = self.world.borrow();
        i64::from(world.allocations) - i64::from(world.frees)
    }
}
