//! Writing generator job files to a work directory.

use std::fs;
use std::path::{Path, PathBuf};

use wlg_bench_core::jobspec::{self, JobSpec};
use wlg_bench_core::ProfileConfig;

use crate::error::{Result, RunnerError};

/// Paths produced by [`generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedJobFiles {
    pub job_files: Vec<PathBuf>,
    pub combined: PathBuf,
    pub job_list: PathBuf,
}

#[must_use]
pub fn job_list_file_name(profile_id: &str, tier: &str) -> String {
    format!("profile_{profile_id}_{tier}_jobs.txt")
}

#[must_use]
pub fn combined_file_name(profile_id: &str, tier: &str) -> String {
    format!("profile_{profile_id}_{tier}.fio")
}

fn write(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| RunnerError::io(path, e))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| RunnerError::io(dir, e))
}

/// Write the standalone job file for one spec and return its path.
pub fn write_job_file(dir: &Path, spec: &JobSpec, profile_name: &str) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(jobspec::job_file_name(spec));
    write(&path, &jobspec::render_job_file(spec, profile_name))?;
    Ok(path)
}

/// Build the tier's specs and write every per-job file, the combined file
/// and the job list.
pub fn generate(profile: &ProfileConfig, tier: &str, dir: &Path) -> Result<GeneratedJobFiles> {
    let specs = jobspec::build(profile, tier)?;
    ensure_dir(dir)?;

    let mut job_files = Vec::with_capacity(specs.len());
    for spec in &specs {
        job_files.push(write_job_file(dir, spec, profile.profile_name())?);
    }

    let combined = dir.join(combined_file_name(profile.profile_id(), tier));
    write(
        &combined,
        &jobspec::render_combined_job_file(&specs, profile.profile_name()),
    )?;

    let job_list = dir.join(job_list_file_name(profile.profile_id(), tier));
    let mut listing = String::new();
    for path in &job_files {
        listing.push_str(&path.display().to_string());
        listing.push('\n');
    }
    write(&job_list, &listing)?;

    tracing::info!(
        tier,
        jobs = job_files.len(),
        dir = %dir.display(),
        "generated job files"
    );
    Ok(GeneratedJobFiles {
        job_files,
        combined,
        job_list,
    })
}
