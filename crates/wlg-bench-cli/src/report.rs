//! Human-readable run reports.

use std::fmt::Write as _;

use wlg_bench_core::{ActualValue, Check, JobOutcome, JobStatus, PowerStatistics, RunRecord};

fn status_icon(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Success => "✓",
        JobStatus::Failed | JobStatus::Error => "✗",
        JobStatus::TimedOut => "⏱",
    }
}

fn format_job(out: &mut String, outcome: &JobOutcome) {
    let icon = status_icon(outcome.status);
    match (&outcome.metrics, &outcome.error) {
        (Some(m), _) => {
            let p99 = m
                .latency_p99_us
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}us"));
            let _ = writeln!(
                out,
                "  {icon} {:<24} {:<9} {:>12.0} IOPS  {:>10.2} MB/s  p99 {p99}",
                outcome.job_name, outcome.status, m.iops, m.throughput_mbps
            );
        }
        (None, err) => {
            let _ = writeln!(
                out,
                "  {icon} {:<24} {:<9} {}",
                outcome.job_name,
                outcome.status,
                err.as_deref()
                    .and_then(|e| e.lines().next())
                    .unwrap_or("")
            );
        }
    }
}

fn format_check(out: &mut String, check: &Check) {
    let icon = if check.passed { "✓" } else { "✗" };
    let actual = match check.actual {
        ActualValue::Measured(v) => format!("{v:.2} {}", check.metric.unit()),
        ActualValue::NoData => "no data".to_string(),
    };
    let _ = writeln!(
        out,
        "  {icon} {:<12} {actual} {} {} {}",
        check.name,
        check.comparator.symbol(),
        check.target,
        check.metric.unit()
    );
}

/// Multi-line summary of a finished run and its verdict.
#[must_use]
pub fn format_report(record: &RunRecord) -> String {
    let rule = "═".repeat(60);
    let verdict = record.verdict.as_ref().map_or("UNEVALUATED", |v| v.label());
    let mut s = format!("\n{rule}\n");
    let _ = writeln!(
        s,
        "  WLG Run: {verdict}  |  profile {} ({})  |  tier {}  |  {:.1}s",
        record.profile_id, record.profile_name, record.tier, record.duration_secs
    );
    let _ = writeln!(
        s,
        "  Jobs: {} total  |  {} success  |  {} failed  |  {} timed out  |  {} error",
        record.jobs.len(),
        record.count_status(JobStatus::Success),
        record.count_status(JobStatus::Failed),
        record.count_status(JobStatus::TimedOut),
        record.count_status(JobStatus::Error),
    );
    if record.cancelled {
        s.push_str("  Run was cancelled\n");
    }
    let _ = writeln!(s, "{rule}");

    s.push_str("\nJobs:\n");
    for outcome in record.jobs.values() {
        format_job(&mut s, outcome);
    }

    match &record.power_stats {
        PowerStatistics::Measured(p) => {
            let _ = writeln!(
                s,
                "\nPower: avg {:.2} W  |  min {:.2} W  |  max {:.2} W  |  p99 {:.2} W  |  {} samples",
                p.avg_watts, p.min_watts, p.max_watts, p.p99_watts, p.sample_count
            );
        }
        PowerStatistics::NoData => s.push_str("\nPower: no data\n"),
    }

    if let Some(verdict) = &record.verdict {
        if verdict.checks.is_empty() {
            s.push_str("\nChecks: none configured\n");
        } else {
            s.push_str("\nChecks:\n");
            for check in &verdict.checks {
                format_check(&mut s, check);
            }
        }
        let _ = writeln!(s, "\nVerdict: {}", verdict.label());
    }
    s
}
