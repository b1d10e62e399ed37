//! Job-spec construction and generator job-file rendering.
//!
//! [`build`] is pure and deterministic: the same profile and tier always
//! produce the same specs in the same order (profile pattern order).

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::block_size::BlockSize;
use crate::error::BuildError;
use crate::profile::{Direction, ProfileConfig};

/// One executable unit derived from a profile pattern and a capacity tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub direction: Direction,
    pub block_size: BlockSize,
    pub queue_depth: u32,
    /// Share of the direction's I/O this job represents.
    pub percentage: u32,
    pub target_mbps: u64,
    pub target_path: String,
    pub runtime_secs: u64,
    pub ramp_time_secs: u64,
    pub tier: String,
}

/// Deterministic job name: `{direction}_{blocksize}_{tier}`.
#[must_use]
pub fn job_name(direction: Direction, block_size: &BlockSize, tier: &str) -> String {
    format!("{direction}_{block_size}_{tier}")
}

/// Read (and mixed) share of the tier's read total, rounded down.
#[must_use]
pub const fn read_share_mbps(read_total_mbps: u64, percentage: u32) -> u64 {
    read_total_mbps * percentage as u64 / 100
}

/// Build the job set for one capacity tier.
pub fn build(profile: &ProfileConfig, tier: &str) -> Result<Vec<JobSpec>, BuildError> {
    let targets = profile.tier(tier).ok_or_else(|| BuildError::UnknownTier {
        tier: tier.to_string(),
        known: profile.tier_labels().collect::<Vec<_>>().join(", "),
    })?;

    let mut seen = BTreeSet::new();
    let mut specs = Vec::with_capacity(profile.patterns().len());
    for pattern in profile.patterns() {
        let name = job_name(pattern.direction, &pattern.block_size, tier);
        if !seen.insert(name.clone()) {
            return Err(BuildError::DuplicateJob(name));
        }

        let target_mbps = match pattern.direction {
            Direction::Read | Direction::Mixed => {
                // Validation guarantees a read total whenever read/mixed patterns exist.
                read_share_mbps(targets.read_total_mbps.unwrap_or(0), pattern.percentage)
            }
            Direction::Write => *targets.write_mbps.get(&pattern.block_size).ok_or_else(|| {
                BuildError::UnknownBlockSize {
                    block_size: pattern.block_size.to_string(),
                    tier: tier.to_string(),
                }
            })?,
        };

        specs.push(JobSpec {
            name,
            direction: pattern.direction,
            block_size: pattern.block_size.clone(),
            queue_depth: pattern.queue_depth,
            percentage: pattern.percentage,
            target_mbps,
            target_path: profile.target_path().to_string(),
            runtime_secs: profile.runtime_secs(),
            ramp_time_secs: profile.ramp_time_secs(),
            tier: tier.to_string(),
        });
    }
    Ok(specs)
}

// ──────────────────────────────────────────────────────────────────────────────
// Job-file rendering
// ──────────────────────────────────────────────────────────────────────────────

fn push_global_section(out: &mut String, runtime_secs: u64, ramp_time_secs: u64) {
    out.push_str("[global]\n");
    out.push_str("ioengine=libaio\n");
    out.push_str("direct=1\n");
    out.push_str("group_reporting=1\n");
    out.push_str("time_based=1\n");
    let _ = writeln!(out, "runtime={runtime_secs}");
    if ramp_time_secs > 0 {
        let _ = writeln!(out, "ramp_time={ramp_time_secs}");
    }
}

fn push_job_section(out: &mut String, spec: &JobSpec) {
    let _ = writeln!(out, "\n[{}]", spec.name);
    let _ = writeln!(out, "rw={}", spec.direction.rw_mode());
    let _ = writeln!(out, "bs={}", spec.block_size);
    out.push_str("numjobs=1\n");
    let _ = writeln!(out, "iodepth={}", spec.queue_depth);
    let _ = writeln!(out, "filename={}", spec.target_path);
    out.push_str("size=100%\n");
    if spec.target_mbps > 0 {
        let _ = writeln!(out, "rate={}m", spec.target_mbps);
    }
    out.push_str("lat_percentiles=1\n");
}

/// Standalone job file for a single spec.
#[must_use]
pub fn render_job_file(spec: &JobSpec, profile_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# WLG {profile_name} - {} {} ({}%)",
        spec.direction, spec.block_size, spec.percentage
    );
    let _ = writeln!(out, "# Target: {} MB/s", spec.target_mbps);
    let _ = writeln!(out, "# Capacity: {}\n", spec.tier);
    push_global_section(&mut out, spec.runtime_secs, spec.ramp_time_secs);
    push_job_section(&mut out, spec);
    out
}

/// One shared global section followed by one section per spec.
#[must_use]
pub fn render_combined_job_file(specs: &[JobSpec], profile_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Generated job file for {profile_name}");
    out.push_str("# DO NOT EDIT - regenerate from the profile\n\n");
    let runtime = specs.first().map_or(0, |s| s.runtime_secs);
    let ramp = specs.first().map_or(0, |s| s.ramp_time_secs);
    push_global_section(&mut out, runtime, ramp);
    for spec in specs {
        push_job_section(&mut out, spec);
    }
    out
}

/// Conventional file name of a spec's job file.
#[must_use]
pub fn job_file_name(spec: &JobSpec) -> String {
    format!("{}.fio", spec.name)
}

/// Human-readable breakdown of one tier's expected workload.
pub fn workload_summary(profile: &ProfileConfig, tier: &str) -> Result<String, BuildError> {
    let specs = build(profile, tier)?;
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "\nWLG {} Workload Summary ({tier})", profile.profile_name());
    let _ = writeln!(out, "{rule}\n");

    let read_total = profile
        .tier(tier)
        .and_then(|t| t.read_total_mbps)
        .unwrap_or(0);
    let mut write_total = 0u64;
    let groups = [
        ("Read", Direction::Read),
        ("Mixed", Direction::Mixed),
        ("Write", Direction::Write),
    ];
    for (label, direction) in groups {
        let group: Vec<&JobSpec> = specs.iter().filter(|s| s.direction == direction).collect();
        if group.is_empty() {
            continue;
        }
        let sum: u64 = group.iter().map(|s| s.target_mbps).sum();
        if direction == Direction::Write {
            write_total = sum;
        }
        let headline = if direction == Direction::Write { sum } else { read_total };
        let _ = writeln!(out, "{label} Throughput: {headline} MB/s");
        for spec in group {
            let _ = writeln!(
                out,
                "  - {}: {} MB/s ({}%)",
                spec.block_size, spec.target_mbps, spec.percentage
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Total I/O: {} MB/s", read_total + write_total);
    match profile.power_limit_watts() {
        Some(w) => {
            let _ = writeln!(out, "Power Limit: {w}W");
        }
        None => out.push_str("Power Limit: N/A\n"),
    }
    let _ = writeln!(out, "Runtime: {} hours", profile.runtime_hours());
    let _ = writeln!(out, "{rule}");
    Ok(out)
}
