//! Runner error types.
//!
//! Per-job failures are recorded as `JobOutcome` values, never as these
//! errors. `RunnerError` covers failures that abort the whole run before any
//! job is launched, plus artifact I/O.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Core(#[from] wlg_bench_core::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no jobs to run for tier {0}")]
    EmptyJobSet(String),
}

impl From<wlg_bench_core::BuildError> for RunnerError {
    fn from(err: wlg_bench_core::BuildError) -> Self {
        Self::Core(err.into())
    }
}

impl RunnerError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether the failure comes from the profile or tier selection.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        match self {
            Self::Core(err) => err.is_config_error(),
            Self::EmptyJobSet(_) => true,
            Self::Io { .. } => false,
        }
    }

    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Core(err) => err.error_type(),
            Self::Io { .. } => "OS_ERROR",
            Self::EmptyJobSet(_) => "EMPTY_JOB_SET",
        }
    }
}
