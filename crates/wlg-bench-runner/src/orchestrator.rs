//! Concurrent run orchestration.
//!
//! One pass: build the tier's job specs, start the power sampler on its own
//! worker, launch one worker per job with a stagger between launches, join
//! every job, then stop the sampler and assemble the [`RunRecord`]. The
//! record holds exactly one outcome per job spec, whatever happened to it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use wlg_bench_core::config::MIN_SAMPLE_INTERVAL_MS;
use wlg_bench_core::{
    HarnessConfig, JobOutcome, JobSpec, JobStatus, PowerSampler, ProfileConfig, RunRecord,
    jobspec,
};

use crate::cancel::CancelToken;
use crate::error::{Result, RunnerError};
use crate::executor::JobRunner;

/// Sleep granularity of the sampler worker, so stop requests land quickly.
const SAMPLER_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Delay between consecutive job launches.
    pub stagger: Duration,
    pub sample_interval: Duration,
    /// Added to each job's runtime and ramp time to form its timeout.
    pub timeout_buffer: Duration,
    /// Fixed per-job timeout, replacing the runtime-derived one.
    pub job_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_harness(&HarnessConfig::default())
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_harness(harness: &HarnessConfig) -> Self {
        Self {
            stagger: harness.stagger(),
            sample_interval: harness.sample_interval(),
            timeout_buffer: Duration::from_secs(harness.timeout_buffer_secs),
            job_timeout: None,
        }
    }

    #[must_use]
    pub fn timeout_for(&self, spec: &JobSpec) -> Duration {
        self.job_timeout.unwrap_or_else(|| {
            Duration::from_secs(spec.runtime_secs.saturating_add(spec.ramp_time_secs))
                + self.timeout_buffer
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return format!("job worker panicked: {msg}");
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return format!("job worker panicked: {msg}");
    }
    "job worker panicked".to_string()
}

fn sampler_loop(
    mut sampler: PowerSampler,
    interval: Duration,
    stop: &AtomicBool,
    cancel: &CancelToken,
) -> PowerSampler {
    let halted = || stop.load(Ordering::Acquire) || cancel.is_cancelled();
    while !halted() {
        sampler.sample();
        let mut remaining = interval;
        while !remaining.is_zero() {
            if halted() {
                return sampler;
            }
            let chunk = remaining.min(SAMPLER_SLICE);
            thread::sleep(chunk);
            remaining = remaining.saturating_sub(chunk);
        }
    }
    sampler
}

pub struct Orchestrator {
    runner: Box<dyn JobRunner>,
    config: OrchestratorConfig,
    cancel: CancelToken,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(runner: impl JobRunner + 'static, config: OrchestratorConfig) -> Self {
        Self {
            runner: Box::new(runner),
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Share an externally owned cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels the run in progress.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run every job of `tier` concurrently while sampling power.
    ///
    /// Fails only when the job set cannot be derived; once jobs are
    /// launched, every failure is recorded in the returned record.
    pub fn run(
        &self,
        profile: &ProfileConfig,
        tier: &str,
        mut sampler: PowerSampler,
    ) -> Result<RunRecord> {
        let specs = jobspec::build(profile, tier)?;
        if specs.is_empty() {
            return Err(RunnerError::EmptyJobSet(tier.to_string()));
        }

        let interval = self
            .config
            .sample_interval
            .max(Duration::from_millis(MIN_SAMPLE_INTERVAL_MS));
        tracing::info!(
            profile = profile.profile_id(),
            tier,
            jobs = specs.len(),
            stagger_ms = u64::try_from(self.config.stagger.as_millis()).unwrap_or(u64::MAX),
            "starting run"
        );

        let started_at = Utc::now();
        let clock = Instant::now();
        sampler.start();
        let stop = AtomicBool::new(false);

        let (outcomes, sampler) = thread::scope(|scope| {
            let sampler_worker = thread::Builder::new()
                .name("power-sampler".into())
                .spawn_scoped(scope, || sampler_loop(sampler, interval, &stop, &self.cancel));

            let mut workers = Vec::with_capacity(specs.len());
            for (idx, spec) in specs.iter().enumerate() {
                if idx > 0 && !self.config.stagger.is_zero() {
                    // A cancelled stagger still launches the rest; each worker
                    // observes the token and records itself as cancelled.
                    self.cancel.sleep(self.config.stagger);
                }
                let timeout = self.config.timeout_for(spec);
                let runner = self.runner.as_ref();
                let cancel = &self.cancel;
                let worker = thread::Builder::new()
                    .name(format!("job-{}", spec.name))
                    .spawn_scoped(scope, move || runner.run(spec, timeout, cancel));
                workers.push((spec, worker));
            }

            let mut outcomes = BTreeMap::new();
            for (spec, worker) in workers {
                let mut outcome = match worker {
                    Ok(handle) => handle.join().unwrap_or_else(|payload| {
                        let msg = panic_message(payload.as_ref());
                        tracing::error!(job = %spec.name, "{msg}");
                        JobOutcome::failure(&spec.name, JobStatus::Error, msg, 0)
                    }),
                    Err(e) => JobOutcome::failure(
                        &spec.name,
                        JobStatus::Error,
                        format!("spawning job worker failed: {e}"),
                        0,
                    ),
                };
                if outcome.job_name != spec.name {
                    tracing::warn!(
                        job = %spec.name,
                        reported = %outcome.job_name,
                        "runner mislabelled its outcome; keeping the job name"
                    );
                    outcome.job_name.clone_from(&spec.name);
                }
                outcomes.insert(spec.name.clone(), outcome);
            }

            stop.store(true, Ordering::Release);
            let sampler = match sampler_worker {
                Ok(handle) => handle.join().ok(),
                Err(e) => {
                    tracing::warn!(error = %e, "spawning power sampler failed");
                    None
                }
            };
            (outcomes, sampler)
        });

        let (power_stats, power_samples) = match sampler {
            Some(mut sampler) => {
                sampler.stop();
                (sampler.statistics(), sampler.into_samples())
            }
            None => {
                tracing::warn!("power sampler was lost; reporting no power data");
                (wlg_bench_core::PowerStatistics::NoData, Vec::new())
            }
        };

        let record = RunRecord {
            profile_id: profile.profile_id().to_string(),
            profile_name: profile.profile_name().to_string(),
            profile_signature: profile.signature().to_string(),
            tier: tier.to_string(),
            started_at,
            ended_at: Utc::now(),
            duration_secs: clock.elapsed().as_secs_f64(),
            jobs: outcomes,
            power_stats,
            power_samples,
            cancelled: self.cancel.is_cancelled(),
            verdict: None,
        };
        tracing::info!(
            succeeded = record.count_status(JobStatus::Success),
            failed = record.count_status(JobStatus::Failed),
            timed_out = record.count_status(JobStatus::TimedOut),
            errored = record.count_status(JobStatus::Error),
            power_samples = record.power_samples.len(),
            duration_secs = record.duration_secs,
            "run finished"
        );
        Ok(record)
    }
}
