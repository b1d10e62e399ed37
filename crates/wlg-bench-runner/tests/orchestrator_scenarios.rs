//! End-to-end orchestration against a fake generator script.
//!
//! The script dispatches on the job file name it is handed: some jobs print
//! a fio JSON report, some sleep until killed, some fail or print garbage,
//! one prints an oversized report and one leaves a grandchild behind.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;
use wlg_bench_core::{
    ActualValue, JobStatus, Metric, PowerReadError, PowerSampler, ProfileConfig, TargetTable,
    evaluate,
};
use wlg_bench_runner::executor::CANCELLED_DETAIL;
use wlg_bench_runner::{ExecutorConfig, FioExecutor, Orchestrator, OrchestratorConfig};

const FAKE_FIO: &str = r#"#!/bin/sh
job="$2"
case "$job" in
  *write_4k_*|*mixed_*)
    exec sleep 30
    ;;
  *write_8k_*)
    echo "fio: pid=1, err=5/file:io_u.c:1889, func=io_u error, error=Input/output error" >&2
    echo "boom on stderr" >&2
    exit 3
    ;;
  *write_16k_*)
    echo "this is not json"
    exit 0
    ;;
  *read_32k_*)
    pad=$(head -c 4000 /dev/zero | tr '\0' 'x')
    echo "{\"jobs\": [{\"jobname\": \"$pad\", \"read\": {\"iops\": 1000.0, \"bw_bytes\": 4000000}, \"write\": {}}]}"
    exit 0
    ;;
  *read_64k_*)
    sleep 30 &
    echo $! > "${job%.fio}.grandchild"
    wait
    ;;
esac
echo "fio: note: preamble line"
cat <<'EOF'
{"fio version": "fio-3.36", "jobs": [{"jobname": "x",
  "read": {"iops": 1000.0, "bw_bytes": 4000000,
           "clat_ns": {"percentile": {"99.000000": 300000}}},
  "write": {"iops": 0.0, "bw_bytes": 0}}]}
EOF
"#;

/// Written once, before any test spawns a process, so no exec can race an
/// open write handle on the script.
fn fake_fio() -> &'static Path {
    static SCRIPT: OnceLock<PathBuf> = OnceLock::new();
    SCRIPT.get_or_init(|| {
        let dir = tempfile::tempdir().expect("tempdir").keep();
        let path = dir.join("fake-fio");
        fs::write(&path, FAKE_FIO).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    })
}

fn profile(patterns: &[(&str, &str, u32)]) -> ProfileConfig {
    let io_patterns: Vec<_> = patterns
        .iter()
        .map(|(dir, bs, pct)| json!({"type": dir, "block_size": bs, "percentage": pct}))
        .collect();
    let write_mbps: serde_json::Map<String, serde_json::Value> = patterns
        .iter()
        .filter(|(dir, _, _)| *dir == "write")
        .map(|(_, bs, _)| ((*bs).to_string(), json!(100)))
        .collect();
    let doc = json!({
        "profile_id": "fake",
        "runtime_hours": 1,
        "ramp_time_secs": 0,
        "io_patterns": io_patterns,
        "throughput_targets": {"64TB": {"read_total_mbps": 1000, "write_mbps": write_mbps}},
        "targets": {}
    });
    ProfileConfig::from_json_str(&doc.to_string()).expect("valid profile")
}

fn executor_config(work_dir: &Path, fio_bin: &Path) -> ExecutorConfig {
    ExecutorConfig {
        fio_bin: fio_bin.display().to_string(),
        work_dir: work_dir.to_path_buf(),
        profile_name: "fake".to_string(),
        ..ExecutorConfig::default()
    }
}

fn orchestrator(work_dir: &Path, fio_bin: &Path, job_timeout: Duration) -> Orchestrator {
    orchestrator_with(executor_config(work_dir, fio_bin), job_timeout)
}

fn orchestrator_with(executor: ExecutorConfig, job_timeout: Duration) -> Orchestrator {
    Orchestrator::new(
        FioExecutor::new(executor),
        OrchestratorConfig {
            stagger: Duration::ZERO,
            sample_interval: Duration::from_millis(20),
            timeout_buffer: Duration::ZERO,
            job_timeout: Some(job_timeout),
        },
    )
}

fn sampler(watts: f64) -> PowerSampler {
    PowerSampler::new(move || Ok::<f64, PowerReadError>(watts))
}

#[test]
fn one_timeout_two_successes() {
    let work = tempfile::tempdir().expect("tempdir");
    let profile = profile(&[("read", "4k", 50), ("read", "8k", 50), ("write", "4k", 100)]);
    let orch = orchestrator(work.path(), fake_fio(), Duration::from_secs(1));

    let start = Instant::now();
    let record = orch.run(&profile, "64TB", sampler(10.0)).expect("run");
    assert!(start.elapsed() < Duration::from_secs(20));

    assert_eq!(record.jobs.len(), 3);
    assert_eq!(record.count_status(JobStatus::Success), 2);
    assert_eq!(record.count_status(JobStatus::TimedOut), 1);
    let timed_out = &record.jobs["write_4k_64TB"];
    assert!(timed_out.metrics.is_none());
    assert!(timed_out.error.as_deref().is_some_and(|e| e.contains("timeout")));

    let targets = TargetTable {
        iops_min: Some(2000.0),
        throughput_mbps_min: Some(8.0),
        latency_p99_us_max: Some(300.0),
        power_avg_watts_max: None,
    };
    let verdict = evaluate(&record, &targets);
    assert_eq!(
        verdict.check(Metric::Iops).map(|c| c.actual),
        Some(ActualValue::Measured(2000.0))
    );
    assert_eq!(
        verdict.check(Metric::Throughput).map(|c| c.actual),
        Some(ActualValue::Measured(8.0))
    );
    assert!(verdict.passed, "{verdict:?}");
}

#[test]
fn failures_and_garbage_are_recorded_not_raised() {
    let work = tempfile::tempdir().expect("tempdir");
    let profile = profile(&[("read", "4k", 100), ("write", "8k", 50), ("write", "16k", 50)]);
    let orch = orchestrator(work.path(), fake_fio(), Duration::from_secs(10));
    let record = orch.run(&profile, "64TB", sampler(10.0)).expect("run");

    assert_eq!(record.jobs.len(), 3);
    assert_eq!(record.jobs["read_4k_64TB"].status, JobStatus::Success);

    let failed = &record.jobs["write_8k_64TB"];
    assert_eq!(failed.status, JobStatus::Failed);
    let detail = failed.error.as_deref().unwrap_or_default();
    assert!(detail.contains("boom on stderr"), "{detail}");

    let garbage = &record.jobs["write_16k_64TB"];
    assert_eq!(garbage.status, JobStatus::Error);
    assert!(
        garbage
            .error
            .as_deref()
            .is_some_and(|e| e.contains("unparseable")),
        "{garbage:?}"
    );

    assert!(work.path().join("write_8k_64TB.fio").exists());
}

#[test]
fn missing_generator_fails_every_job() {
    fake_fio();
    let work = tempfile::tempdir().expect("tempdir");
    let profile = profile(&[("read", "4k", 50), ("read", "8k", 50)]);
    let orch = orchestrator(
        work.path(),
        &work.path().join("no-such-fio"),
        Duration::from_secs(5),
    );
    let record = orch.run(&profile, "64TB", sampler(10.0)).expect("run");
    assert_eq!(record.jobs.len(), 2);
    assert!(record.jobs.values().all(|o| {
        o.status == JobStatus::Error && o.error.as_deref().is_some_and(|e| e.contains("spawn"))
    }));
    assert!(!evaluate(
        &record,
        &TargetTable {
            iops_min: Some(1.0),
            ..TargetTable::default()
        }
    )
    .passed);
}

#[test]
fn cancellation_stops_running_jobs() {
    let work = tempfile::tempdir().expect("tempdir");
    let profile = profile(&[("mixed", "4k", 100), ("write", "4k", 100)]);
    let orch = orchestrator(work.path(), fake_fio(), Duration::from_secs(60));
    let token = orch.cancel_token();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        token.cancel();
    });

    let start = Instant::now();
    let record = orch.run(&profile, "64TB", sampler(10.0)).expect("run");
    canceller.join().expect("join");

    assert!(start.elapsed() < Duration::from_secs(20));
    assert!(record.cancelled);
    assert_eq!(record.jobs.len(), 2);
    assert!(record.jobs.values().all(|o| o.status == JobStatus::Error
        && o.error.as_deref() == Some(CANCELLED_DETAIL)));
}

#[test]
fn report_larger_than_diagnostic_cap_still_parses() {
    let work = tempfile::tempdir().expect("tempdir");
    let profile = profile(&[("read", "32k", 100)]);
    let orch = orchestrator_with(
        ExecutorConfig {
            max_output_bytes: 1024,
            ..executor_config(work.path(), fake_fio())
        },
        Duration::from_secs(10),
    );
    let record = orch.run(&profile, "64TB", sampler(10.0)).expect("run");
    let outcome = &record.jobs["read_32k_64TB"];
    assert_eq!(outcome.status, JobStatus::Success, "{outcome:?}");
    assert_eq!(outcome.metrics.map(|m| m.iops), Some(1000.0));
}

/// `false` once the process is gone or only a zombie awaiting its reaper.
#[cfg(target_os = "linux")]
fn process_running(pid: &str) -> bool {
    fs::read_to_string(format!("/proc/{pid}/stat")).is_ok_and(|stat| {
        stat.rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .is_some_and(|state| state != 'Z' && state != 'X')
    })
}

#[cfg(target_os = "linux")]
#[test]
fn timeout_kills_the_generators_whole_process_group() {
    let work = tempfile::tempdir().expect("tempdir");
    let profile = profile(&[("read", "64k", 100)]);
    let orch = orchestrator(work.path(), fake_fio(), Duration::from_secs(1));
    let record = orch.run(&profile, "64TB", sampler(10.0)).expect("run");
    assert_eq!(record.jobs["read_64k_64TB"].status, JobStatus::TimedOut);

    let pid_file = work.path().join("read_64k_64TB.grandchild");
    let pid = fs::read_to_string(&pid_file).expect("grandchild pid");
    let pid = pid.trim();
    assert!(!pid.is_empty());

    let deadline = Instant::now() + Duration::from_secs(5);
    while process_running(pid) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    assert!(!process_running(pid), "grandchild {pid} outlived its timed-out job");
}

#[test]
fn record_round_trips_through_disk() {
    let work = tempfile::tempdir().expect("tempdir");
    let profile = profile(&[("read", "4k", 100)]);
    let orch = orchestrator(work.path(), fake_fio(), Duration::from_secs(10));
    let record = orch.run(&profile, "64TB", sampler(10.0)).expect("run");
    let verdict = evaluate(&record, &profile.effective_targets());
    let record = record.with_verdict(verdict);

    let path = work.path().join("results/run.json");
    record.save(&path).expect("save");
    let loaded = wlg_bench_core::RunRecord::load(&path).expect("load");
    assert_eq!(loaded.jobs.len(), 1);
    assert_eq!(loaded.verdict.map(|v| v.passed), Some(true));
    assert_eq!(loaded.power_stats.avg_watts(), Some(10.0));
}
