//! Scheduler facade configuration
//!
//! 기본값, 환경 변수, JSON 파일 세 가지 경로로 구성할 수 있다.

use crate::error::{WtsError, WtsResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory where the service stores `.job` files.
pub const DEFAULT_JOB_STORE_DIR: &str = r"C:\Windows\Tasks";

/// Names requested per `IEnumWorkItems::Next` call.
pub const DEFAULT_ENUM_BATCH_SIZE: u32 = 5;

/// Upper bound, in UTF-16 units, for strings read back from the service.
pub const DEFAULT_MAX_NAME_LEN: usize = 256;

pub const ENV_JOB_STORE_DIR: &str = "WTS_JOB_STORE_DIR";
pub const ENV_TARGET_HOST: &str = "WTS_TARGET_HOST";
pub const ENV_ENUM_BATCH_SIZE: &str = "WTS_ENUM_BATCH_SIZE";

/// 스케줄러 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Directory scanned by `TaskScheduler::exists`.
    pub job_store_dir: PathBuf,
    /// Remote host to target right after the root is created (`None` = local).
    pub target_host: Option<String>,
    pub enum_batch_size: u32,
    pub max_name_len: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            job_store_dir: PathBuf::from(DEFAULT_JOB_STORE_DIR),
            target_host: None,
            enum_batch_size: DEFAULT_ENUM_BATCH_SIZE,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.job_store_dir = dir.into();
        self
    }

    pub fn with_target_host(mut self, host: impl Into<String>) -> Self {
        self.target_host = Some(host.into());
        self
    }

    pub fn with_enum_batch_size(mut self, size: u32) -> Self {
        self.enum_batch_size = size;
        self
    }

    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    /// 설정 값 검증
    pub fn validate(&self) -> WtsResult<()> {
        if self.enum_batch_size == 0 {
            return Err(WtsError::Config(
                "enum_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_name_len == 0 {
            return Err(WtsError::Config(
                "max_name_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 환경 변수에서 로드
    pub fn from_env() -> WtsResult<Self> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Same as [`SchedulerConfig::from_env`], reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> WtsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_JOB_STORE_DIR).filter(|v| !v.is_empty()) {
            config.job_store_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup(ENV_TARGET_HOST).filter(|v| !v.is_empty()) {
            config.target_host = Some(host);
        }
        if let Some(size) = lookup(ENV_ENUM_BATCH_SIZE) {
            config.enum_batch_size = size.trim().parse().map_err(|_| {
                WtsError::Config(format!("{ENV_ENUM_BATCH_SIZE} must be a number, got '{size}'"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// 파일에서 로드
    pub fn load_from_file(path: impl AsRef<Path>) -> WtsResult<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// 파일에 저장
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> WtsResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;

        // 디렉토리 생성
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, json)?;
        Ok(())
    }
}
