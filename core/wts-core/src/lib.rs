//! # WTS — Windows Task Scheduler 1.0 client
//!
//! WTS는 작업 스케줄러 서비스(`ITaskScheduler` / `ITask`)를 메서드 테이블 직접
//! 호출만으로 다루는 클라이언트 라이브러리입니다. 미리 생성된 바인딩 없이
//! 슬롯 번호와 시그니처를 타입으로 고정해 호출합니다.
//!
//! ## 주요 특징
//!
//! - **Typed slots**: `Slot<Interface, Signature>` constants, checked against
//!   the interface's method-table length at compile time
//! - **Owning guard**: [`ComPtr`] releases every acquired object exactly once
//! - **Bit-exact trigger codec**: the 48-byte `TASK_TRIGGER` structure
//! - **Explicit session**: the component runtime is a [`Session`] value
//!
//! ## 빠른 시작
//!
//! ```rust,no_run
//! # #[cfg(windows)]
//! # fn main() -> wts_core::WtsResult<()> {
//! use wts_core::trigger::{days, Trigger, TriggerType};
//! use wts_core::TaskScheduler;
//!
//! let mut ts = TaskScheduler::new()?;
//!
//! let trigger = Trigger::new(TriggerType::Weekly {
//!     weeks_interval: 1,
//!     days_of_week: days::MONDAY | days::THURSDAY,
//! })
//! .with_start_date(2026, 10, 19)
//! .with_start_time(3, 30);
//!
//! ts.new_job("nightly-backup", Some(&trigger))?;
//! ts.set_application_path(r"C:\tools\backup.exe")?;
//! ts.set_arguments("--full")?;
//! ts.save(None)?;
//!
//! assert!(ts.enumerate()?.iter().any(|n| n == "nightly-backup.job"));
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! ## 모듈 구조
//!
//! - [`com`] — method-table dispatch, interface slot tables, [`ComPtr`]
//! - [`trigger`] — [`Trigger`] model and its wire codec
//! - [`runtime`] — [`ComRuntime`] and [`Session`]
//! - [`scheduler`] — [`TaskScheduler`] service-level operations
//! - [`job`] — per-job operations on [`TaskScheduler`]
//! - [`config`] — [`SchedulerConfig`]

pub mod com;
pub mod config;
pub mod error;
pub mod job;
pub mod runtime;
pub mod scheduler;
pub mod time;
pub mod trigger;
pub mod wide;

// Logging utilities
pub mod logging;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use com::{ComPtr, HResult};
pub use config::SchedulerConfig;
pub use error::{WtsError, WtsResult};
pub use job::{JobStatus, Priority};
pub use runtime::{ComRuntime, Session};
pub use scheduler::TaskScheduler;
pub use trigger::{Trigger, TriggerKind, TriggerType};
