//! Error types for the WTS task scheduler client.
//!
//! All public APIs return `WtsResult<T>` — no panics in library code.

use thiserror::Error;

/// Unified error type for all WTS operations.
#[derive(Debug, Error)]
pub enum WtsError {
    /// A required scheduler root or job handle is not bound
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(&'static str),

    /// Caller supplied a value of the wrong shape
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A job with the same name is already registered
    #[error("job '{0}' already exists")]
    AlreadyExists(String),

    /// A component method returned a failure status
    #[error("failed to call {method} with HRESULT {code:#010x}")]
    CommandFailed { method: &'static str, code: u32 },

    /// Trigger kind code outside the known set
    #[error("unsupported trigger kind {0}")]
    UnsupportedTriggerKind(u32),

    /// A SYSTEMTIME returned by the service could not be represented
    #[error("invalid time: {0}")]
    InvalidTime(String),

    /// Component runtime could not be initialized or is not available
    #[error("component runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WtsError {
    /// Raw status code carried by the error, if any.
    pub fn code(&self) -> Option<u32> {
        match self {
            WtsError::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for all WTS operations.
pub type WtsResult<T> = Result<T, WtsError>;

impl From<serde_json::Error> for WtsError {
    fn from(err: serde_json::Error) -> Self {
        WtsError::Config(err.to_string())
    }
}
