//! Harness configuration read from `WLG_*` environment variables.
//!
//! Every field has a typed default; unparseable values fall back to the
//! default rather than failing the run. CLI flags override after loading.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FIO_BIN: &str = "fio";
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 10;
pub const DEFAULT_STAGGER_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_BUFFER_SECS: u64 = 300;
pub const DEFAULT_WORK_DIR: &str = "output";
pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub fio_bin: String,
    pub sample_interval_ms: u64,
    pub stagger_ms: u64,
    pub timeout_buffer_secs: u64,
    pub work_dir: PathBuf,
    pub results_dir: PathBuf,
    pub power_command: Option<String>,
    /// Cap on generator stderr kept for failure details.
    pub max_output_bytes: usize,
    /// Simulate generator runs and power readings instead of touching a device.
    pub dry_run: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fio_bin: DEFAULT_FIO_BIN.to_string(),
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            stagger_ms: DEFAULT_STAGGER_MS,
            timeout_buffer_secs: DEFAULT_TIMEOUT_BUFFER_SECS,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            power_command: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            dry_run: false,
        }
    }
}

impl HarnessConfig {
    /// Load from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |key: &str, default: u64| {
            value(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        let defaults = Self::default();
        Self {
            fio_bin: value("WLG_FIO_BIN").unwrap_or(defaults.fio_bin),
            sample_interval_ms: number("WLG_SAMPLE_INTERVAL_MS", DEFAULT_SAMPLE_INTERVAL_MS)
                .max(MIN_SAMPLE_INTERVAL_MS),
            stagger_ms: number("WLG_STAGGER_MS", DEFAULT_STAGGER_MS),
            timeout_buffer_secs: number("WLG_TIMEOUT_BUFFER_SECS", DEFAULT_TIMEOUT_BUFFER_SECS),
            work_dir: value("WLG_WORK_DIR").map_or(defaults.work_dir, PathBuf::from),
            results_dir: value("WLG_RESULTS_DIR").map_or(defaults.results_dir, PathBuf::from),
            power_command: value("WLG_POWER_COMMAND"),
            max_output_bytes: value("WLG_MAX_OUTPUT_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_OUTPUT_BYTES),
            dry_run: value("WLG_DRY_RUN").is_some_and(|v| parse_bool(&v, false)),
        }
    }

    #[must_use]
    pub const fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    #[must_use]
    pub const fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }
}

pub fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => true,
        "0" | "false" | "f" | "no" | "n" => false,
        _ => default,
    }
}
