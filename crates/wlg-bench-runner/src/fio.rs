//! Parsing of fio `--output-format=json` reports into job metrics.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use wlg_bench_core::JobMetrics;

/// Percentile key fio uses for p99.
const P99_KEY: &str = "99.000000";

#[derive(Debug, Error)]
pub enum FioParseError {
    #[error("no JSON document in generator output")]
    NoDocument,

    #[error("malformed generator JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("generator report contains no jobs")]
    NoJobs,
}

#[derive(Debug, Deserialize)]
struct FioReport {
    #[serde(default)]
    jobs: Vec<FioJob>,
}

#[derive(Debug, Default, Deserialize)]
struct FioJob {
    #[serde(default)]
    read: FioDirection,
    #[serde(default)]
    write: FioDirection,
}

#[derive(Debug, Default, Deserialize)]
struct FioDirection {
    #[serde(default)]
    iops: f64,
    #[serde(default)]
    bw_bytes: f64,
    #[serde(default)]
    clat_ns: Option<FioLatency>,
    #[serde(default)]
    lat_ns: Option<FioLatency>,
}

#[derive(Debug, Default, Deserialize)]
struct FioLatency {
    #[serde(default)]
    percentile: BTreeMap<String, f64>,
}

impl FioLatency {
    fn p99_ns(&self) -> Option<f64> {
        self.percentile.get(P99_KEY).copied().or_else(|| {
            self.percentile
                .iter()
                .find(|(k, _)| k.parse::<f64>().is_ok_and(|p| (p - 99.0).abs() < 1e-9))
                .map(|(_, v)| *v)
        })
    }
}

impl FioDirection {
    /// Completion latency p99, falling back to total latency when fio only
    /// reported `lat_percentiles`.
    fn p99_us(&self) -> Option<f64> {
        self.clat_ns
            .as_ref()
            .and_then(FioLatency::p99_ns)
            .or_else(|| self.lat_ns.as_ref().and_then(FioLatency::p99_ns))
            .map(|ns| ns / 1000.0)
    }
}

/// Locate the JSON report, skipping any preamble fio printed before it.
fn locate_report(output: &str) -> Result<FioReport, FioParseError> {
    let mut last_err = None;
    let mut offset = 0;
    for line in output.split_inclusive('\n') {
        if line.trim_start().starts_with('{') {
            let mut stream =
                serde_json::Deserializer::from_str(&output[offset..]).into_iter::<FioReport>();
            match stream.next() {
                Some(Ok(report)) => return Ok(report),
                Some(Err(err)) => last_err = Some(err),
                None => {}
            }
        }
        offset += line.len();
    }
    Err(last_err.map_or(FioParseError::NoDocument, FioParseError::Malformed))
}

/// Extract aggregate metrics from a fio JSON report.
///
/// IOPS and bandwidth are summed over every job and direction; p99 latency
/// is the worst 99th percentile seen, or `None` if no direction reported one.
pub fn parse_output(output: &str) -> Result<JobMetrics, FioParseError> {
    let report = locate_report(output)?;
    if report.jobs.is_empty() {
        return Err(FioParseError::NoJobs);
    }

    let mut iops = 0.0;
    let mut bytes_per_sec = 0.0;
    let mut p99_us: Option<f64> = None;
    for job in &report.jobs {
        for dir in [&job.read, &job.write] {
            iops += dir.iops;
            bytes_per_sec += dir.bw_bytes;
            if let Some(p) = dir.p99_us() {
                p99_us = Some(p99_us.map_or(p, |worst| worst.max(p)));
            }
        }
    }

    Ok(JobMetrics {
        iops,
        throughput_mbps: bytes_per_sec / 1_000_000.0,
        latency_p99_us: p99_us,
    })
}
