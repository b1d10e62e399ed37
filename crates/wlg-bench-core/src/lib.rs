//! Core model for WLG storage benchmark runs
//!
//! This crate provides:
//! - Profile loading and validation (`ProfileConfig`)
//! - Job-spec derivation and job-file rendering (`jobspec`)
//! - Power sampling sessions and statistics (`PowerSampler`)
//! - Run records and pass/fail evaluation (`RunRecord`, `evaluate`)
//! - Harness configuration from the environment (`HarnessConfig`)

#![forbid(unsafe_code)]

pub mod block_size;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod jobspec;
pub mod outcome;
pub mod power;
pub mod profile;

pub use block_size::{BlockSize, InvalidBlockSize};
pub use config::HarnessConfig;
pub use error::{
    BuildError, ConfigValidationError, Error, PowerReadError, ProfileError, Result,
    ValidationIssue,
};
pub use evaluate::{ActualValue, Check, Comparator, Metric, Verdict, evaluate};
pub use jobspec::JobSpec;
pub use outcome::{JobMetrics, JobOutcome, JobStatus, RunRecord};
pub use power::{PowerSample, PowerSampler, PowerSource, PowerStatistics, PowerStats};
pub use profile::{Direction, IoPattern, ProfileConfig, TargetTable, TierTargets};
