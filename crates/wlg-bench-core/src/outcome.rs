//! Per-job outcomes and the combined run record.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluate::Verdict;
use crate::power::{PowerSample, PowerStatistics};

/// Terminal status of one job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed,
    TimedOut,
    Error,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Metrics extracted from a successful generator run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    pub iops: f64,
    pub throughput_mbps: f64,
    /// Worst p99 completion latency; `None` when the generator reported none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_p99_us: Option<f64>,
}

/// Result of exactly one job execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_name: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<JobMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl JobOutcome {
    #[must_use]
    pub fn success(job_name: impl Into<String>, metrics: JobMetrics, elapsed_ms: u64) -> Self {
        Self {
            job_name: job_name.into(),
            status: JobStatus::Success,
            metrics: Some(metrics),
            error: None,
            elapsed_ms,
            completed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn failure(
        job_name: impl Into<String>,
        status: JobStatus,
        error: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        debug_assert!(status != JobStatus::Success);
        Self {
            job_name: job_name.into(),
            status,
            metrics: None,
            error: Some(error.into()),
            elapsed_ms,
            completed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

/// Complete account of one orchestration pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub profile_id: String,
    pub profile_name: String,
    pub profile_signature: String,
    pub tier: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub jobs: BTreeMap<String, JobOutcome>,
    pub power_stats: PowerStatistics,
    #[serde(default)]
    pub power_samples: Vec<PowerSample>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl RunRecord {
    /// Outcomes that produced metrics, in job-name order.
    pub fn successful(&self) -> impl Iterator<Item = &JobOutcome> {
        self.jobs.values().filter(|o| o.is_success())
    }

    #[must_use]
    pub fn count_status(&self, status: JobStatus) -> usize {
        self.jobs.values().filter(|o| o.status == status).count()
    }

    /// Attach the verdict, consuming the record.
    #[must_use]
    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    /// Write the record as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
