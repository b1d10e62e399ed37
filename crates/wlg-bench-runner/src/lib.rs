//! Job execution, power sources and run orchestration for WLG benchmarks.

#![forbid(unsafe_code)]

pub mod cancel;
pub mod error;
pub mod executor;
pub mod fio;
pub mod jobfiles;
pub mod orchestrator;
pub mod power_source;

pub use cancel::CancelToken;
pub use error::{Result, RunnerError};
pub use executor::{DryRunExecutor, ExecutorConfig, FioExecutor, JobRunner};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use power_source::{CommandPowerSource, SimulatedPowerSource, UnavailablePowerSource};
