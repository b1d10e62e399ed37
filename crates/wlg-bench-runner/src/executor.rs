//! Job execution: one generator process per job spec, bounded by a timeout.
//!
//! Every call to [`JobRunner::run`] yields exactly one [`JobOutcome`]. Spawn
//! failures, non-zero exits, timeouts, unparseable output and cancellation
//! all become outcomes rather than errors.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use wlg_bench_core::config::DEFAULT_MAX_OUTPUT_BYTES;
use wlg_bench_core::{HarnessConfig, JobMetrics, JobOutcome, JobSpec, JobStatus};

use crate::cancel::CancelToken;
use crate::fio;
use crate::jobfiles;

/// Number of trailing stderr lines kept for failure diagnostics.
const STDERR_TAIL_LINES: usize = 50;

/// Metrics reported by simulated runs.
pub const DRY_RUN_METRICS: JobMetrics = JobMetrics {
    iops: 875_000.0,
    throughput_mbps: 12_500.0,
    latency_p99_us: Some(450.0),
};

/// Detail recorded for jobs stopped by run cancellation.
pub const CANCELLED_DETAIL: &str = "cancelled";

/// Executes a single job spec.
pub trait JobRunner: Send + Sync {
    fn run(&self, spec: &JobSpec, timeout: Duration, cancel: &CancelToken) -> JobOutcome;
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

// ──────────────────────────────────────────────────────────────────────────────
// fio-backed executor
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub fio_bin: String,
    pub work_dir: PathBuf,
    pub profile_name: String,
    /// Cap on stderr kept for failure details. Stdout is never truncated.
    pub max_output_bytes: usize,
    pub poll_interval: Duration,
}

impl ExecutorConfig {
    #[must_use]
    pub fn from_harness(harness: &HarnessConfig, profile_name: impl Into<String>) -> Self {
        Self {
            fio_bin: harness.fio_bin.clone(),
            work_dir: harness.work_dir.clone(),
            profile_name: profile_name.into(),
            max_output_bytes: harness.max_output_bytes,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            fio_bin: "fio".to_string(),
            work_dir: PathBuf::from("output"),
            profile_name: String::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Runs `fio --output-format=json <jobfile>` for each spec.
#[derive(Debug, Clone)]
pub struct FioExecutor {
    config: ExecutorConfig,
}

enum Exit {
    Finished(ExitStatus),
    TimedOut,
    Cancelled,
    WaitFailed(std::io::Error),
}

/// Drain the report pipe to EOF. The report is kept whole: cutting it would
/// turn a successful run into an unparseable one.
fn capture_all(mut reader: impl Read) -> Vec<u8> {
    let mut kept = Vec::new();
    if let Err(e) = reader.read_to_end(&mut kept) {
        tracing::debug!(error = %e, "generator stdout read ended early");
    }
    kept
}

/// Drain a diagnostic pipe to EOF, retaining only its last `cap` bytes.
fn capture_tail(mut reader: impl Read, cap: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        kept.extend_from_slice(&buf[..n]);
        if kept.len() > cap.saturating_mul(2) {
            let excess = kept.len() - cap;
            kept.drain(..excess);
        }
    }
    if kept.len() > cap {
        let excess = kept.len() - cap;
        kept.drain(..excess);
    }
    kept
}

/// Last `STDERR_TAIL_LINES` lines, clipped to `max_bytes` on a char boundary.
fn stderr_tail(stderr: &str, max_bytes: usize) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let mut tail = lines[start..].join("\n");
    if tail.len() > max_bytes {
        let mut cut = tail.len() - max_bytes;
        while !tail.is_char_boundary(cut) {
            cut += 1;
        }
        tail.drain(..cut);
    }
    tail
}

/// Kill the job's whole process group so no generator workers outlive it.
fn terminate(child: &mut Child, job: &str) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        match i32::try_from(child.id()) {
            Ok(pid) => {
                if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                    tracing::warn!(job, error = %e, "killpg failed, killing child directly");
                    if let Err(e) = child.kill() {
                        tracing::warn!(job, error = %e, "kill failed");
                    }
                }
            }
            Err(_) => {
                if let Err(e) = child.kill() {
                    tracing::warn!(job, error = %e, "kill failed");
                }
            }
        }
    }
    #[cfg(not(unix))]
    if let Err(e) = child.kill() {
        tracing::warn!(job, error = %e, "kill failed");
    }

    if let Err(e) = child.wait() {
        tracing::warn!(job, error = %e, "reaping killed generator failed");
    }
}

impl FioExecutor {
    #[must_use]
    pub const fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn command(&self, job_file: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.config.fio_bin);
        cmd.arg("--output-format=json")
            .arg(job_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }

    fn wait(
        &self,
        child: &mut Child,
        job: &str,
        start: Instant,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Exit {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Exit::Finished(status),
                Ok(None) => {
                    if cancel.is_cancelled() {
                        terminate(child, job);
                        return Exit::Cancelled;
                    }
                    if start.elapsed() > timeout {
                        tracing::warn!(job, timeout_secs = timeout.as_secs(), "job timed out");
                        terminate(child, job);
                        return Exit::TimedOut;
                    }
                    thread::sleep(self.config.poll_interval);
                }
                Err(e) => {
                    terminate(child, job);
                    return Exit::WaitFailed(e);
                }
            }
        }
    }

    fn finish(
        &self,
        spec: &JobSpec,
        start: Instant,
        exit: Exit,
        stdout: &str,
        stderr: &str,
    ) -> JobOutcome {
        let name = spec.name.as_str();
        let elapsed = elapsed_ms(start);
        match exit {
            Exit::Finished(status) if status.success() => match fio::parse_output(stdout) {
                Ok(metrics) => JobOutcome::success(name, metrics, elapsed),
                Err(e) => JobOutcome::failure(
                    name,
                    JobStatus::Error,
                    format!("unparseable generator output: {e}"),
                    elapsed,
                ),
            },
            Exit::Finished(status) => {
                let tail = stderr_tail(stderr, self.config.max_output_bytes);
                let detail = if tail.is_empty() {
                    format!("generator exited with {status}")
                } else {
                    format!("generator exited with {status}: {tail}")
                };
                JobOutcome::failure(name, JobStatus::Failed, detail, elapsed)
            }
            Exit::TimedOut => JobOutcome::failure(
                name,
                JobStatus::TimedOut,
                format!("timeout after {}s", start.elapsed().as_secs()),
                elapsed,
            ),
            Exit::Cancelled => {
                JobOutcome::failure(name, JobStatus::Error, CANCELLED_DETAIL, elapsed)
            }
            Exit::WaitFailed(e) => JobOutcome::failure(
                name,
                JobStatus::Error,
                format!("waiting on generator failed: {e}"),
                elapsed,
            ),
        }
    }
}

impl JobRunner for FioExecutor {
    fn run(&self, spec: &JobSpec, timeout: Duration, cancel: &CancelToken) -> JobOutcome {
        let start = Instant::now();
        let name = spec.name.as_str();
        if cancel.is_cancelled() {
            return JobOutcome::failure(name, JobStatus::Error, CANCELLED_DETAIL, 0);
        }

        let job_file = match jobfiles::write_job_file(
            &self.config.work_dir,
            spec,
            &self.config.profile_name,
        ) {
            Ok(path) => path,
            Err(e) => {
                return JobOutcome::failure(
                    name,
                    JobStatus::Error,
                    format!("writing job file failed: {e}"),
                    elapsed_ms(start),
                );
            }
        };

        let mut child = match self.command(&job_file).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(job = name, bin = %self.config.fio_bin, error = %e, "spawn failed");
                return JobOutcome::failure(
                    name,
                    JobStatus::Error,
                    format!("spawn failed: {e}"),
                    elapsed_ms(start),
                );
            }
        };
        tracing::info!(job = name, pid = child.id(), file = %job_file.display(), "job launched");

        let cap = self.config.max_output_bytes;
        let stdout_reader = child
            .stdout
            .take()
            .map(|out| thread::spawn(move || capture_all(out)));
        let stderr_reader = child
            .stderr
            .take()
            .map(|err| thread::spawn(move || capture_tail(err, cap)));

        let exit = self.wait(&mut child, name, start, timeout, cancel);

        let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
            handle
                .and_then(|h| h.join().ok())
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default()
        };
        let stdout = collect(stdout_reader);
        let stderr = collect(stderr_reader);

        let outcome = self.finish(spec, start, exit, &stdout, &stderr);
        tracing::info!(
            job = name,
            status = %outcome.status,
            elapsed_ms = outcome.elapsed_ms,
            "job finished"
        );
        outcome
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Dry run
// ──────────────────────────────────────────────────────────────────────────────

/// Simulates a successful generator run after a short delay.
#[derive(Debug, Clone)]
pub struct DryRunExecutor {
    delay: Duration,
}

impl Default for DryRunExecutor {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
        }
    }
}

impl DryRunExecutor {
    #[must_use]
    pub const fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl JobRunner for DryRunExecutor {
    fn run(&self, spec: &JobSpec, timeout: Duration, cancel: &CancelToken) -> JobOutcome {
        let start = Instant::now();
        tracing::info!(job = %spec.name, "dry-run job launched");
        let outcome = if !cancel.sleep(self.delay.min(timeout)) {
            JobOutcome::failure(&spec.name, JobStatus::Error, CANCELLED_DETAIL, elapsed_ms(start))
        } else if self.delay > timeout {
            JobOutcome::failure(
                &spec.name,
                JobStatus::TimedOut,
                format!("timeout after {}s", timeout.as_secs()),
                elapsed_ms(start),
            )
        } else {
            JobOutcome::success(&spec.name, DRY_RUN_METRICS, elapsed_ms(start))
        };
        tracing::info!(job = %spec.name, status = %outcome.status, "dry-run job finished");
        outcome
    }
}
