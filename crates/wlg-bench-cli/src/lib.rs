//! `wlg` command-line interface.
//!
//! Exit codes: 0 PASS (or command succeeded), 1 runtime error (including an
//! interrupted run), 2 configuration or usage error, 3 verdict FAIL.

#![forbid(unsafe_code)]

pub mod report;
mod signals;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use wlg_bench_core::{
    HarnessConfig, PowerSampler, ProfileConfig, ProfileError, ValidationIssue, evaluate, jobspec,
};
use wlg_bench_runner::{
    CommandPowerSource, DryRunExecutor, ExecutorConfig, FioExecutor, Orchestrator,
    OrchestratorConfig, RunnerError, SimulatedPowerSource, UnavailablePowerSource, jobfiles,
};

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WlgExitCode {
    Pass = 0,
    RuntimeError = 1,
    UsageError = 2,
    VerdictFail = 3,
}

impl WlgExitCode {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("exit code {0}")]
    ExitCode(i32),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Core(#[from] wlg_bench_core::Error),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("run record not written to {path}: {source}")]
    RecordSave {
        path: String,
        #[source]
        source: wlg_bench_core::Error,
    },
    #[error("run interrupted; partial record written to {record}")]
    Interrupted { record: String },
}

impl From<wlg_bench_core::BuildError> for CliError {
    fn from(err: wlg_bench_core::BuildError) -> Self {
        Self::Core(err.into())
    }
}

impl CliError {
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ExitCode(code) => *code,
            Self::InvalidArgument(_) | Self::Profile(_) => WlgExitCode::UsageError.code(),
            Self::Core(err) if err.is_config_error() => WlgExitCode::UsageError.code(),
            Self::Runner(err) if err.is_config_error() => WlgExitCode::UsageError.code(),
            _ => WlgExitCode::RuntimeError.code(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "wlg", version, about = "WLG storage benchmark harness")]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate a profile, reporting every problem found.
    Validate {
        profile: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the expected workload breakdown per capacity tier.
    Summary {
        profile: PathBuf,
        /// Only this tier (default: every tier in the profile).
        #[arg(long)]
        tier: Option<String>,
    },
    /// Write generator job files without running anything.
    Generate {
        profile: PathBuf,
        #[arg(long)]
        tier: String,
        /// Output directory (default: WLG_WORK_DIR).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run every job of a tier concurrently, sample power and evaluate.
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    pub profile: PathBuf,
    #[arg(long)]
    pub tier: String,
    /// Simulate generator runs and power readings.
    #[arg(long)]
    pub dry_run: bool,
    /// Print the run record as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,
    /// Where to write the run record (default: WLG_RESULTS_DIR/run_<id>_<tier>_<time>.json).
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Fixed per-job timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    #[arg(long)]
    pub stagger_ms: Option<u64>,
    #[arg(long)]
    pub sample_interval_ms: Option<u64>,
}

pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match execute(cli) {
        Ok(()) => WlgExitCode::Pass.code(),
        Err(err) => {
            emit_error(&err);
            err.exit_code()
        }
    }
}

fn emit_error(err: &CliError) {
    if matches!(err, CliError::ExitCode(_)) {
        return;
    }
    eprintln!("error: {err}");
}

pub fn execute(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Validate { profile, json } => handle_validate(&profile, json),
        Commands::Summary { profile, tier } => handle_summary(&profile, tier.as_deref()),
        Commands::Generate {
            profile,
            tier,
            output,
        } => handle_generate(&profile, &tier, output),
        Commands::Run(args) => handle_run(&args, HarnessConfig::from_env()),
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// validate / summary / generate
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    valid: bool,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    issues: &'a [ValidationIssue],
}

fn handle_validate(path: &Path, json: bool) -> CliResult<()> {
    let shown = path.display().to_string();
    let profile = match ProfileConfig::load(path) {
        Ok(profile) => profile,
        Err(err) if json => {
            let issues: &[ValidationIssue] = match &err {
                ProfileError::Validation(v) => &v.issues,
                _ => &[],
            };
            let report = ValidationReport {
                valid: false,
                path: shown,
                profile_id: None,
                signature: None,
                error_type: Some(match &err {
                    ProfileError::Validation(_) => "CONFIG_VALIDATION",
                    ProfileError::Parse(_) => "CONFIG_PARSE",
                    ProfileError::Io { .. } => "OS_ERROR",
                }),
                error: Some(err.to_string()),
                issues,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Err(CliError::ExitCode(WlgExitCode::UsageError.code()));
        }
        Err(err) => return Err(err.into()),
    };

    if json {
        let report = ValidationReport {
            valid: true,
            path: shown,
            profile_id: Some(profile.profile_id()),
            signature: Some(profile.signature()),
            error_type: None,
            error: None,
            issues: &[],
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let tiers: Vec<&str> = profile.tier_labels().collect();
        println!(
            "{shown}: profile {} ({}) is valid: {} pattern(s), tiers [{}], signature {}",
            profile.profile_id(),
            profile.profile_name(),
            profile.patterns().len(),
            tiers.join(", "),
            profile.signature()
        );
    }
    Ok(())
}

fn handle_summary(path: &Path, tier: Option<&str>) -> CliResult<()> {
    let profile = ProfileConfig::load(path)?;
    let tiers: Vec<String> = match tier {
        Some(t) => vec![t.to_string()],
        None => profile.tier_labels().map(str::to_string).collect(),
    };
    if tiers.is_empty() {
        return Err(CliError::InvalidArgument(
            "profile defines no throughput tiers".to_string(),
        ));
    }
    for tier in &tiers {
        print!("{}", jobspec::workload_summary(&profile, tier)?);
    }
    Ok(())
}

fn handle_generate(path: &Path, tier: &str, output: Option<PathBuf>) -> CliResult<()> {
    let profile = ProfileConfig::load(path)?;
    let dir = output.unwrap_or_else(|| HarnessConfig::from_env().work_dir);
    let generated = jobfiles::generate(&profile, tier, &dir)?;
    for file in &generated.job_files {
        println!("{}", file.display());
    }
    println!("{}", generated.combined.display());
    println!("{}", generated.job_list.display());
    Ok(())
}

// ──────────────────────────────────────────────────────────────────────────────
// run
// ──────────────────────────────────────────────────────────────────────────────

/// Apply CLI overrides on top of the environment-derived configuration.
#[must_use]
pub fn apply_overrides(mut harness: HarnessConfig, args: &RunArgs) -> HarnessConfig {
    if let Some(ms) = args.stagger_ms {
        harness.stagger_ms = ms;
    }
    if let Some(ms) = args.sample_interval_ms {
        harness.sample_interval_ms = ms.max(wlg_bench_core::config::MIN_SAMPLE_INTERVAL_MS);
    }
    harness.dry_run |= args.dry_run;
    harness
}

fn power_sampler(harness: &HarnessConfig, profile: &ProfileConfig) -> PowerSampler {
    if harness.dry_run {
        return match profile.power_limit_watts() {
            Some(limit) => PowerSampler::new(SimulatedPowerSource::new(limit)),
            None => PowerSampler::new(UnavailablePowerSource),
        };
    }
    match &harness.power_command {
        Some(cmd) => PowerSampler::new(CommandPowerSource::new(cmd.clone())),
        None => {
            tracing::warn!("WLG_POWER_COMMAND not set; power will be reported as no data");
            PowerSampler::new(UnavailablePowerSource)
        }
    }
}

fn default_record_path(harness: &HarnessConfig, profile: &ProfileConfig, tier: &str) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    harness
        .results_dir
        .join(format!("run_{}_{tier}_{stamp}.json", profile.profile_id()))
}

fn handle_run(args: &RunArgs, harness: HarnessConfig) -> CliResult<()> {
    let harness = apply_overrides(harness, args);
    let profile = ProfileConfig::load(&args.profile)?;

    let mut orch_config = OrchestratorConfig::from_harness(&harness);
    orch_config.job_timeout = args.timeout_secs.map(Duration::from_secs);

    let orchestrator = if harness.dry_run {
        tracing::info!("dry run: generator and power readings are simulated");
        Orchestrator::new(DryRunExecutor::default(), orch_config)
    } else {
        let executor = FioExecutor::new(ExecutorConfig::from_harness(
            &harness,
            profile.profile_name(),
        ));
        Orchestrator::new(executor, orch_config)
    };

    let _interrupts = match signals::InterruptGuard::install(orchestrator.cancel_token()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!(error = %e, "cannot watch for interrupts; Ctrl-C will not stop jobs");
            None
        }
    };

    let record = orchestrator.run(&profile, &args.tier, power_sampler(&harness, &profile))?;
    let verdict = evaluate(&record, &profile.effective_targets());
    let passed = verdict.passed;
    let record = record.with_verdict(verdict);

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| default_record_path(&harness, &profile, &args.tier));
    let saved = record.save(&path);

    // The outcome is printed even when the record cannot be persisted.
    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", report::format_report(&record));
        if saved.is_ok() {
            println!("Record: {}", path.display());
        }
    }

    let shown = path.display().to_string();
    if let Err(source) = saved {
        return Err(CliError::RecordSave {
            path: shown,
            source,
        });
    }
    tracing::info!(path = %shown, "run record written");

    if record.cancelled {
        return Err(CliError::Interrupted { record: shown });
    }
    if passed {
        Ok(())
    } else {
        Err(CliError::ExitCode(WlgExitCode::VerdictFail.code()))
    }
}
